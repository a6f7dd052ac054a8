#![warn(missing_docs)]
//! Experience replay for reinforcement learning training loops.
//!
//! This crate provides a bounded store of transition records supporting
//! high-throughput insertion, uniform or priority-weighted sampling, and
//! post-hoc priority updates. The public contract is three operations:
//! `extend` a batch of transitions in, `sample` a batch out (with
//! importance weights and the sampled ids attached), and
//! `update_priority` to feed corrected priorities back after a gradient
//! step.
//!
//! See [`replay_buffer::ReplayBuffer`] for the buffer itself and the
//! `rebuf-prefetch` crate for a wrapper that overlaps sampling with
//! consumption on a background thread.
pub mod error;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};

mod batch;
pub use batch::{FieldArray, Schema, TransitionBatch};

pub mod replay_buffer;
