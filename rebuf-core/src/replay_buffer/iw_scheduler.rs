//! Scheduling of the importance-weight exponent.
use serde::{Deserialize, Serialize};

/// Linear annealing of the importance-weight exponent `beta`.
///
/// `beta` grows from `beta_0` to `beta_final` over `n_opts_final`
/// optimization steps and stays at `beta_final` afterwards. Setting
/// `beta_0 == beta_final` keeps the exponent constant.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of beta.
    pub beta_0: f32,

    /// Final value of beta.
    pub beta_final: f32,

    /// Optimization steps after which beta reaches its final value.
    pub n_opts_final: usize,

    /// Optimization steps so far.
    pub n_opts: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_final: f32, n_opts_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_opts_final,
            n_opts: 0,
        }
    }

    /// Current value of beta.
    pub fn beta(&self) -> f32 {
        if self.n_opts >= self.n_opts_final {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            self.beta_0 + d * (self.n_opts as f32 / self.n_opts_final as f32)
        }
    }

    /// Advances the schedule by one optimization step.
    pub fn add_n_opts(&mut self) {
        self.n_opts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::IwScheduler;

    #[test]
    fn beta_anneals_linearly_to_its_final_value() {
        let mut s = IwScheduler::new(0.4, 1.0, 10);
        assert_eq!(s.beta(), 0.4);
        for _ in 0..5 {
            s.add_n_opts();
        }
        assert!((s.beta() - 0.7).abs() < 1e-6);
        for _ in 0..10 {
            s.add_n_opts();
        }
        assert_eq!(s.beta(), 1.0);
    }

    #[test]
    fn equal_endpoints_give_a_constant_beta() {
        let mut s = IwScheduler::new(1.0, 1.0, 100);
        assert_eq!(s.beta(), 1.0);
        s.add_n_opts();
        assert_eq!(s.beta(), 1.0);
    }
}
