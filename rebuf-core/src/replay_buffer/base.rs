//! The replay buffer controller.
use super::{
    config::ReplayBufferConfig, iw_scheduler::IwScheduler, storage::CircularStorage,
    sum_tree::SumTree, weights::importance_weights, WeightNormalizer,
};
use crate::{
    batch::{Schema, TransitionBatch},
    error::ReplayError,
    ExperienceBufferBase, ReplayBufferBase,
};
use anyhow::Result;
use log::debug;
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// State of prioritized sampling: the priority index plus the beta schedule.
struct PerState {
    alpha: f32,
    normalize: WeightNormalizer,
    sum_tree: SumTree,
    iw_scheduler: IwScheduler,
}

/// Uniform draw in `[0, 1)` with 24 bits of precision.
fn uniform01(rng: &mut StdRng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

/// A bounded store of transition records with uniform or priority-weighted
/// sampling and post-hoc priority updates.
///
/// The controller exclusively owns the circular storage and the sum-tree
/// priority index; all mutation goes through [`extend`] and
/// [`update_priority`], and each public operation either completes or
/// leaves the buffer untouched. New transitions enter at the write cursor,
/// which wraps around when the buffer is full, evicting the oldest
/// occupants (FIFO). Every inserted transition starts at the largest
/// priority seen so far, so it is sampled at least once with high
/// probability before its priority is corrected.
///
/// [`extend`]: ExperienceBufferBase::extend
/// [`update_priority`]: ReplayBufferBase::update_priority
pub struct ReplayBuffer {
    capacity: usize,
    cursor: usize,
    size: usize,
    /// Total number of transitions ever written; the next insertion id.
    next_id: u64,
    storage: CircularStorage,
    /// Largest priority seen so far, assigned to new insertions.
    max_priority: f32,
    replacement: bool,
    per_state: Option<PerState>,
    rng: StdRng,
    n_stale_updates: usize,
}

impl ReplayBuffer {
    /// Maximum number of transitions that can be stored.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current write position in `[0, capacity)`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The schema fixed by the first `extend` call, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.storage.schema()
    }

    /// Total priority mass of the index; `None` without prioritized sampling.
    pub fn priority_total(&self) -> Option<f32> {
        self.per_state.as_ref().map(|per| per.sum_tree.total())
    }

    /// Smallest and largest transformed priority currently in the index;
    /// `None` without prioritized sampling.
    pub fn priority_bounds(&self) -> Option<(f32, f32)> {
        self.per_state
            .as_ref()
            .map(|per| (per.sum_tree.min(), per.sum_tree.max()))
    }

    /// Number of priority updates dropped because their slot was evicted.
    pub fn n_stale_updates(&self) -> usize {
        self.n_stale_updates
    }

    /// Draws `batch_size` slots uniformly from the occupied range.
    fn draw_uniform(&mut self, batch_size: usize) -> Vec<usize> {
        if self.replacement {
            (0..batch_size)
                .map(|_| (self.rng.next_u32() as usize) % self.size)
                .collect()
        } else {
            // partial Fisher-Yates over [0, size)
            let mut pool: Vec<usize> = (0..self.size).collect();
            for i in 0..batch_size {
                let j = i + (self.rng.next_u32() as usize) % (self.size - i);
                pool.swap(i, j);
            }
            pool.truncate(batch_size);
            pool
        }
    }
}

impl ExperienceBufferBase for ReplayBuffer {
    type Item = TransitionBatch;

    /// Appends a batch of transitions at the write cursor, wrapping.
    ///
    /// The first call fixes the buffer's schema; later batches that do not
    /// match it are rejected whole, with no partial write. Every written
    /// slot gets the current maximum priority in the index, so the record
    /// and its priority become visible together.
    fn extend(&mut self, batch: Self::Item) -> Result<Vec<u64>> {
        let n = batch.len();
        if n == 0 {
            return Ok(vec![]);
        }
        self.storage.ensure_schema(&batch)?;

        self.storage.write(self.cursor, &batch, self.next_id);
        if let Some(per) = &mut self.per_state {
            for j in 0..n {
                let slot = (self.cursor + j) % self.capacity;
                per.sum_tree.set(slot, self.max_priority)?;
            }
        }

        let ids = (self.next_id..self.next_id + n as u64).collect();
        self.next_id += n as u64;
        self.cursor = (self.cursor + n) % self.capacity;
        self.size = (self.size + n).min(self.capacity);
        Ok(ids)
    }

    fn len(&self) -> usize {
        self.size
    }
}

impl ReplayBufferBase for ReplayBuffer {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Self {
        let per_state = config.per_config.as_ref().map(|per| PerState {
            alpha: per.alpha,
            normalize: per.normalize,
            sum_tree: SumTree::new(config.capacity, per.alpha),
            iw_scheduler: IwScheduler::new(per.beta_0, per.beta_final, per.n_opts_final),
        });

        Self {
            capacity: config.capacity,
            cursor: 0,
            size: 0,
            next_id: 0,
            storage: CircularStorage::new(config.capacity),
            max_priority: 1.0,
            replacement: config.replacement,
            per_state,
            rng: StdRng::seed_from_u64(config.seed),
            n_stale_updates: 0,
        }
    }

    /// Draws a batch of transitions.
    ///
    /// With prioritized sampling each transition is drawn with probability
    /// proportional to its transformed priority, and the batch carries
    /// normalized importance weights. `alpha == 0` is a distinct uniform
    /// fast path that bypasses the sum tree entirely and emits weights of
    /// exactly 1. Without a prioritized configuration the weights are
    /// `None`. The sampled insertion ids are attached to the batch for
    /// later priority feedback.
    fn sample(&mut self, batch_size: usize) -> Result<Self::Batch> {
        if self.size == 0 {
            return Err(ReplayError::EmptyIndex.into());
        }
        if !self.replacement && batch_size > self.size {
            return Err(ReplayError::InsufficientData {
                requested: batch_size,
                stored: self.size,
            }
            .into());
        }

        let prioritized = self
            .per_state
            .as_ref()
            .map_or(false, |per| per.alpha > 0.0);

        let (slots, weight) = if prioritized {
            let us: Vec<f32> = (0..batch_size).map(|_| uniform01(&mut self.rng)).collect();
            let per = self.per_state.as_ref().unwrap();
            let total = per.sum_tree.total();
            let beta = per.iw_scheduler.beta();

            let mut slots = Vec::with_capacity(batch_size);
            for u in us {
                slots.push(per.sum_tree.sample(u)?);
            }
            let leaves: Vec<f32> = slots.iter().map(|&s| per.sum_tree.leaf(s)).collect();
            let ws = importance_weights(
                &leaves,
                total,
                self.size,
                beta,
                per.normalize,
                per.sum_tree.min(),
            );
            (slots, Some(ws))
        } else {
            let weight = self.per_state.as_ref().map(|_| vec![1.0; batch_size]);
            (self.draw_uniform(batch_size), weight)
        };

        let ids: Vec<u64> = slots.iter().map(|&s| self.storage.slot_id(s)).collect();
        let mut batch = self.storage.gather(&slots);
        batch.ix_sample = Some(ids);
        batch.weight = weight;
        Ok(batch)
    }

    /// Writes back new priorities for previously sampled transitions.
    ///
    /// Arguments are validated before any mutation, so a failing call
    /// leaves the index unchanged. Ids whose slot has since been reused
    /// are skipped and counted; eviction races with a concurrent producer
    /// are expected and must not crash the training loop. Each call
    /// advances the beta schedule by one optimization step.
    fn update_priority(&mut self, ids: &[u64], priorities: &[f32]) -> Result<()> {
        if ids.len() != priorities.len() {
            return Err(ReplayError::LengthMismatch {
                indices: ids.len(),
                priorities: priorities.len(),
            }
            .into());
        }
        for &p in priorities {
            if !p.is_finite() || p < 0.0 {
                return Err(ReplayError::InvalidPriority(p).into());
            }
        }

        if let Some(per) = &mut self.per_state {
            for (&id, &p) in ids.iter().zip(priorities.iter()) {
                let slot = (id % self.capacity as u64) as usize;
                if self.storage.slot_id(slot) != id {
                    self.n_stale_updates += 1;
                    debug!("dropping priority update for evicted id {}", id);
                    continue;
                }
                per.sum_tree.set(slot, p)?;
                if p > self.max_priority {
                    self.max_priority = p;
                }
            }
            per.iw_scheduler.add_n_opts();
        }
        Ok(())
    }
}
