//! Sum tree for prioritized sampling.
//!
//! A complete binary tree over slot indices: each leaf holds the
//! alpha-transformed priority of one slot, each internal node the sum of
//! its children, so the root carries the total priority mass. Point
//! updates and weighted sampling both take `log2(n)` steps.
use crate::error::ReplayError;
use segment_tree::{
    ops::{MaxIgnoreNaN, MinIgnoreNaN},
    SegmentPoint,
};

/// Internal nodes are recomputed from scratch after this many point updates
/// to bound floating-point drift in the running sums.
const REBUILD_INTERVAL: usize = 1 << 16;

/// Priority index over the slots of a replay buffer.
pub(crate) struct SumTree {
    eps: f32,
    alpha: f32,
    capacity: usize,
    /// Number of leaves; `capacity` rounded up to a power of two.
    n: usize,
    /// Flat tree of `2 * n` nodes, root at index 1, leaves at `[n, 2n)`.
    tree: Vec<f32>,
    min_tree: SegmentPoint<f32, MinIgnoreNaN>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
    sets_since_rebuild: usize,
}

impl SumTree {
    pub fn new(capacity: usize, alpha: f32) -> Self {
        let n = capacity.next_power_of_two();
        Self {
            eps: 1e-8,
            alpha,
            capacity,
            n,
            tree: vec![0.0; 2 * n],
            min_tree: SegmentPoint::build(vec![f32::MAX; capacity], MinIgnoreNaN),
            max_tree: SegmentPoint::build(vec![0.0; capacity], MaxIgnoreNaN),
            sets_since_rebuild: 0,
        }
    }

    /// Sets the priority of a slot and restores the sum invariant.
    ///
    /// The stored leaf value is `(priority + eps)^alpha`; the epsilon keeps
    /// zero-priority slots sampleable. Each ancestor is recomputed from its
    /// children, so every internal node is exactly the sum of its children
    /// after this call returns.
    pub fn set(&mut self, slot: usize, priority: f32) -> Result<(), ReplayError> {
        if !priority.is_finite() || priority < 0.0 {
            return Err(ReplayError::InvalidPriority(priority));
        }
        debug_assert!(slot < self.capacity);

        let p = (priority + self.eps).powf(self.alpha);
        self.min_tree.modify(slot, p);
        self.max_tree.modify(slot, p);

        let mut node = self.n + slot;
        self.tree[node] = p;
        while node > 1 {
            node /= 2;
            self.tree[node] = self.tree[2 * node] + self.tree[2 * node + 1];
        }

        self.sets_since_rebuild += 1;
        if self.sets_since_rebuild >= REBUILD_INTERVAL {
            self.rebuild();
        }
        Ok(())
    }

    /// Total priority mass (the root value).
    pub fn total(&self) -> f32 {
        self.tree[1]
    }

    /// Transformed priority of a slot, `(priority + eps)^alpha`.
    pub fn leaf(&self, slot: usize) -> f32 {
        self.tree[self.n + slot]
    }

    /// Smallest transformed priority over all occupied slots.
    ///
    /// Slots never written keep `f32::MAX` in the companion tree, so they
    /// do not contribute.
    pub fn min(&self) -> f32 {
        self.min_tree.query(0, self.capacity)
    }

    /// Largest transformed priority over all occupied slots.
    pub fn max(&self) -> f32 {
        self.max_tree.query(0, self.capacity)
    }

    /// Maps a uniform draw `u` in `[0, 1)` to a slot with probability
    /// proportional to its leaf value.
    ///
    /// The target cumulative value is clamped to the total before the
    /// descent, and a right subtree without mass is never entered, so the
    /// result is a valid occupied slot even under small numerical error.
    /// Fails with [`ReplayError::EmptyIndex`] when no priority has been set.
    pub fn sample(&self, u: f32) -> Result<usize, ReplayError> {
        let total = self.total();
        if total <= 0.0 {
            return Err(ReplayError::EmptyIndex);
        }
        let mut target = (u * total).clamp(0.0, total);

        let mut node = 1;
        while node < self.n {
            let left = 2 * node;
            let right = left + 1;
            if target < self.tree[left] || self.tree[right] <= 0.0 {
                node = left;
            } else {
                target -= self.tree[left];
                node = right;
            }
        }
        Ok((node - self.n).min(self.capacity - 1))
    }

    /// Recomputes every internal node from the leaves.
    pub fn rebuild(&mut self) {
        for node in (1..self.n).rev() {
            self.tree[node] = self.tree[2 * node] + self.tree[2 * node + 1];
        }
        self.sets_since_rebuild = 0;
    }

    #[cfg(test)]
    fn check_invariant(&self) {
        for node in 1..self.n {
            assert_eq!(
                self.tree[node],
                self.tree[2 * node] + self.tree[2 * node + 1],
                "node {} is not the sum of its children",
                node
            );
        }
    }
}
