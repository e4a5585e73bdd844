//! A fixed-capacity priority queue keeping the `k` closest candidates seen so far.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate node and its distance to the query point, ordered by distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate<H> {
    pub(crate) handle: H,
    pub(crate) distance: f64,
}

impl<H: PartialEq> Eq for Candidate<H> {}

impl<H: PartialEq> Ord for Candidate<H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

impl<H: PartialEq> PartialOrd for Candidate<H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of at most `capacity` candidates. Pushing into a full queue evicts the farthest
/// candidate if the new one is closer.
#[derive(Debug, Clone)]
pub(crate) struct BoundedQueue<H> {
    heap: BinaryHeap<Candidate<H>>,
    capacity: usize,
}

impl<H: PartialEq> BoundedQueue<H> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, handle: H, distance: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.is_incomplete() {
            self.heap.push(Candidate { handle, distance });
        } else if distance < self.max_distance() {
            self.heap.push(Candidate { handle, distance });
            self.heap.pop();
        }
    }

    /// Whether fewer than `capacity` candidates have been seen.
    #[inline]
    pub(crate) fn is_incomplete(&self) -> bool {
        self.heap.len() < self.capacity
    }

    /// Distance of the farthest kept candidate; `+inf` until the queue is full.
    #[inline]
    pub(crate) fn max_distance(&self) -> f64 {
        if self.is_incomplete() {
            return f64::INFINITY;
        }
        self.heap.peek().map_or(f64::INFINITY, |c| c.distance)
    }

    /// The kept candidates, closest first.
    pub(crate) fn into_sorted_vec(self) -> Vec<Candidate<H>> {
        self.heap.into_sorted_vec()
    }
}
