//! Replay buffer with optional prioritized sampling.
//!
//! The buffer is built from a [`ReplayBufferConfig`]. Without a
//! [`PerConfig`] it samples uniformly; with one, sampling is weighted by
//! per-transition priorities held in a sum-tree index, and sampled batches
//! carry importance-sampling correction weights.
mod base;
mod config;
mod iw_scheduler;
mod storage;
mod sum_tree;
mod weights;

pub use base::ReplayBuffer;
pub use config::{PerConfig, ReplayBufferConfig};
pub use iw_scheduler::IwScheduler;
pub use weights::WeightNormalizer;
