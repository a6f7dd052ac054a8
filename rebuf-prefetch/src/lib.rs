#![warn(missing_docs)]
//! Prefetching wrapper for replay buffers.
//!
//! Wraps any [`ReplayBufferBase`](rebuf_core::ReplayBufferBase)
//! implementation so that batch sampling runs ahead of consumption on a
//! background thread, hiding sampling latency behind the consumer's
//! optimization steps.
mod base;
mod config;
mod stat;

pub use base::Prefetcher;
pub use config::PrefetcherConfig;
pub use stat::PrefetchStat;
