//! Configuration of the replay buffer.
use super::{WeightNormalizer, WeightNormalizer::Batch};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration for prioritized sampling.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Priority exponent. Higher values increase the bias towards
    /// high-priority transitions; 0 degenerates to uniform sampling.
    pub alpha: f32,

    /// Initial value of the importance-weight exponent.
    pub beta_0: f32,

    /// Final value of the importance-weight exponent, typically 1.0 to
    /// fully compensate for the non-uniform sampling.
    pub beta_final: f32,

    /// Optimization steps after which beta reaches its final value.
    pub n_opts_final: usize,

    /// How importance weights are normalized.
    pub normalize: WeightNormalizer,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            n_opts_final: 500_000,
            normalize: Batch,
        }
    }
}

impl PerConfig {
    /// Sets the priority exponent.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance-weight exponent.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final importance-weight exponent.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of optimization steps of the beta schedule.
    pub fn n_opts_final(mut self, n_opts_final: usize) -> Self {
        self.n_opts_final = n_opts_final;
        self
    }

    /// Sets the weight normalization mode.
    pub fn normalize(mut self, normalize: WeightNormalizer) -> Self {
        self.normalize = normalize;
        self
    }
}

/// Configuration for the replay buffer.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions that can be stored. When the buffer
    /// is full, new transitions overwrite the oldest ones.
    pub capacity: usize,

    /// Seed of the sampling RNG, for reproducibility.
    pub seed: u64,

    /// Whether sampling may return the same transition more than once.
    /// With replacement disabled, requesting more transitions than are
    /// stored fails instead.
    pub replacement: bool,

    /// Prioritized sampling configuration; `None` samples uniformly.
    pub per_config: Option<PerConfig>,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            replacement: true,
            per_config: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets whether sampling draws with replacement.
    pub fn replacement(mut self, replacement: bool) -> Self {
        self.replacement = replacement;
        self
    }

    /// Sets the prioritized sampling configuration.
    pub fn per_config(mut self, per_config: Option<PerConfig>) -> Self {
        self.per_config = per_config;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PerConfig, ReplayBufferConfig};
    use tempdir::TempDir;

    #[test]
    fn yaml_round_trip() {
        let dir = TempDir::new("rebuf_config").unwrap();
        let path = dir.path().join("replay.yaml");

        let config = ReplayBufferConfig::default()
            .capacity(256)
            .seed(7)
            .replacement(false)
            .per_config(Some(PerConfig::default().alpha(0.7).beta_0(0.5)));
        config.save(&path).unwrap();

        let loaded = ReplayBufferConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
