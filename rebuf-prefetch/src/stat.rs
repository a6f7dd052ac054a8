//! Stats of the prefetching process.

/// Counters of how sampled batches were served.
#[derive(Clone, Debug, Default)]
pub struct PrefetchStat {
    /// Batches delivered from the prefetch queue.
    pub from_queue: usize,

    /// Batches computed synchronously because the queue was empty.
    pub synchronous: usize,
}

impl PrefetchStat {
    /// Fraction of batches served from the queue.
    pub fn hit_rate(&self) -> f32 {
        let total = self.from_queue + self.synchronous;
        if total == 0 {
            0.0
        } else {
            self.from_queue as f32 / total as f32
        }
    }
}
