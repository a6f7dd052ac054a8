//! Configuration of the prefetcher.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Prefetcher`](crate::Prefetcher).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PrefetcherConfig {
    /// Number of transitions per sampled batch.
    pub batch_size: usize,

    /// Number of batches computed ahead of consumption. Zero disables the
    /// background thread entirely and every `sample` call runs
    /// synchronously.
    pub prefetch_depth: usize,
}

impl Default for PrefetcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            prefetch_depth: 3,
        }
    }
}

impl PrefetcherConfig {
    /// Sets the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the lookahead depth.
    pub fn prefetch_depth(mut self, prefetch_depth: usize) -> Self {
        self.prefetch_depth = prefetch_depth;
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
