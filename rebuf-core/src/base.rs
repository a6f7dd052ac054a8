//! Core interfaces of the experience replay subsystem.
//!
//! Two traits split the producer-facing and consumer-facing halves of a
//! replay buffer. A training loop typically writes transitions through
//! [`ExperienceBufferBase::extend`] on one path while another path draws
//! batches through [`ReplayBufferBase::sample`] and feeds priorities back
//! through [`ReplayBufferBase::update_priority`].
use anyhow::Result;

/// Interface for buffers that accept experience from a producer.
pub trait ExperienceBufferBase {
    /// The type of items written into the buffer.
    type Item;

    /// Appends a batch of transitions.
    ///
    /// Returns the insertion ids assigned to the written transitions, in
    /// write order. These ids are what [`ReplayBufferBase::update_priority`]
    /// later accepts; an id becomes stale once its slot is reused.
    fn extend(&mut self, batch: Self::Item) -> Result<Vec<u64>>;

    /// Returns the current number of stored transitions.
    fn len(&self) -> usize;

    /// Returns `true` when no transitions are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for buffers that generate sample batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters of the buffer.
    type Config: Clone;

    /// The type of batch handed to the consumer.
    type Batch;

    /// Builds a buffer from the given configuration.
    fn build(config: &Self::Config) -> Self;

    /// Draws a batch of `batch_size` transitions.
    ///
    /// Fails fast on an empty buffer instead of waiting for data.
    fn sample(&mut self, batch_size: usize) -> Result<Self::Batch>;

    /// Writes back new priorities for previously sampled transitions.
    ///
    /// `ids` are insertion ids returned by `extend` (also attached to
    /// sampled batches). Ids whose slot has since been evicted are skipped
    /// silently; eviction races are expected, not exceptional.
    fn update_priority(&mut self, ids: &[u64], priorities: &[f32]) -> Result<()>;
}
