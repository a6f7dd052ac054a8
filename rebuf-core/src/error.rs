//! Error types for replay buffer operations.
use thiserror::Error;

/// Errors raised by replay buffer operations.
///
/// Every error is local to the offending call: the buffer, its storage and
/// its priority index are left unchanged when an operation fails.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A priority was negative, NaN or infinite.
    #[error("invalid priority: {0}")]
    InvalidPriority(f32),

    /// A batch did not match the schema fixed by the first `extend` call.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Sampling was requested from a buffer or priority index with no elements.
    #[error("cannot sample from an empty buffer")]
    EmptyIndex,

    /// More samples were requested than stored, with replacement disabled.
    #[error("insufficient data: requested {requested} samples, {stored} stored")]
    InsufficientData {
        /// Requested batch size.
        requested: usize,
        /// Number of transitions currently stored.
        stored: usize,
    },

    /// `update_priority` was called with mismatched argument lengths.
    #[error("length mismatch: {indices} indices, {priorities} priorities")]
    LengthMismatch {
        /// Number of indices passed.
        indices: usize,
        /// Number of priorities passed.
        priorities: usize,
    },
}
