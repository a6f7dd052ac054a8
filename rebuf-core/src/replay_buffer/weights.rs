//! Importance-sampling weight computation.
//!
//! Prioritized sampling biases the data distribution; the correction
//! weight of item `i` is `w_i = (N * p_i)^-beta` where `p_i` is its true
//! sampling probability. Weights are normalized so the largest one is 1,
//! which stabilizes the gradient scale downstream. This is a pure function
//! of the sampled leaf values and the tree totals, kept separate from
//! storage so it is independently testable.
use serde::{Deserialize, Serialize};

/// How importance-sampling weights are normalized.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub enum WeightNormalizer {
    /// Divide by the largest possible weight over the whole buffer,
    /// derived from the smallest stored priority.
    All,
    /// Divide by the largest weight within the sampled batch. The maximum
    /// weight of each batch is then exactly 1.
    Batch,
}

/// Computes normalized importance weights for a sampled batch.
///
/// `leaves` are the transformed priorities of the sampled slots, `total`
/// the tree total, `n` the number of stored transitions and `min_leaf` the
/// smallest transformed priority in the buffer (used by
/// [`WeightNormalizer::All`]).
pub(crate) fn importance_weights(
    leaves: &[f32],
    total: f32,
    n: usize,
    beta: f32,
    normalizer: WeightNormalizer,
    min_leaf: f32,
) -> Vec<f32> {
    let scale = n as f32 / total;
    let ws: Vec<f32> = leaves.iter().map(|&p| (scale * p).powf(-beta)).collect();

    let w_max = match normalizer {
        WeightNormalizer::Batch => ws.iter().fold(f32::NEG_INFINITY, |m, &w| w.max(m)),
        WeightNormalizer::All => (scale * min_leaf).powf(-beta),
    };

    ws.iter().map(|&w| w / w_max).collect()
}
