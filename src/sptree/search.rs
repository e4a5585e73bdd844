//! Branch-and-bound search shared by the KD and BSP trees.
//!
//! Every query walks the near side of a split first, offers the node to a [`Collector`] and
//! then asks the collector whether the far side can still hold anything it would accept.

use std::marker::PhantomData;

use tinyvec::TinyVec;

use crate::error::{Result, SPTreeError};
use crate::point::Point;
use crate::queue::BoundedQueue;
use crate::stats::Stats;
use crate::store::{NodeStore, Split};
use crate::value::NodeInfo;

/// Accumulates the result of one query.
pub(crate) trait Collector<H> {
    /// Look at an entry at `distance` from the query point. Returns whether it was kept.
    fn offer(&mut self, handle: H, distance: f64) -> bool;

    /// Whether a subtree whose points are at least `bound` away may still contribute.
    fn reaches(&self, bound: f64) -> bool;
}

/// The single closest entry.
pub(crate) struct Nearest<H> {
    best: Option<H>,
    distance: f64,
}

impl<H> Nearest<H> {
    pub(crate) fn new() -> Self {
        Self {
            best: None,
            distance: f64::INFINITY,
        }
    }
}

impl<H> Collector<H> for Nearest<H> {
    fn offer(&mut self, handle: H, distance: f64) -> bool {
        if distance < self.distance {
            self.best = Some(handle);
            self.distance = distance;
            true
        } else {
            false
        }
    }

    // Only strictly closer entries replace the best one, so ties on the far side can be skipped.
    fn reaches(&self, bound: f64) -> bool {
        bound < self.distance
    }
}

/// The `k` closest entries.
pub(crate) struct KNearest<H> {
    queue: BoundedQueue<H>,
}

impl<H: PartialEq> KNearest<H> {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            queue: BoundedQueue::new(k),
        }
    }
}

impl<H: PartialEq> Collector<H> for KNearest<H> {
    fn offer(&mut self, handle: H, distance: f64) -> bool {
        let accepted = self.queue.is_incomplete() || distance < self.queue.max_distance();
        self.queue.push(handle, distance);
        accepted
    }

    fn reaches(&self, bound: f64) -> bool {
        self.queue.is_incomplete() || bound <= self.queue.max_distance()
    }
}

/// Every entry within `radius`.
pub(crate) struct InSphere<H> {
    radius: f64,
    found: Vec<(H, f64)>,
}

impl<H> InSphere<H> {
    pub(crate) fn new(radius: f64) -> Self {
        Self {
            radius,
            found: vec![],
        }
    }
}

impl<H> Collector<H> for InSphere<H> {
    fn offer(&mut self, handle: H, distance: f64) -> bool {
        if distance <= self.radius {
            self.found.push((handle, distance));
            true
        } else {
            false
        }
    }

    fn reaches(&self, bound: f64) -> bool {
        bound <= self.radius
    }
}

/// One query against one store.
pub(crate) struct Search<'a, const D: usize, P, S> {
    store: &'a S,
    stats: &'a Stats,
    point: &'a Point<D>,
    phantom: PhantomData<P>,
}

impl<'a, const D: usize, P: Clone, S: NodeStore<D, P>> Search<'a, D, P, S> {
    pub(crate) fn new(store: &'a S, stats: &'a Stats, point: &'a Point<D>) -> Self {
        Self {
            store,
            stats,
            point,
            phantom: PhantomData,
        }
    }

    pub(crate) fn nearest(&self) -> Result<NodeInfo<D, P>> {
        let mut collector = Nearest::new();
        self.run(&mut collector);
        self.finish_nearest(collector)
    }

    pub(crate) fn k_nearest(&self, k: usize) -> Vec<NodeInfo<D, P>> {
        let k = k.min(self.store.len());
        if k == 0 {
            return vec![];
        }
        let mut collector = KNearest::new(k);
        self.run(&mut collector);
        self.finish_k_nearest(collector)
    }

    pub(crate) fn in_sphere(&self, radius: f64) -> Vec<NodeInfo<D, P>> {
        let mut collector = InSphere::new(radius);
        self.run(&mut collector);
        self.finish_in_sphere(collector)
    }

    pub(crate) fn nearest_brute_force(&self) -> Result<NodeInfo<D, P>> {
        let mut collector = Nearest::new();
        self.scan(&mut collector);
        self.finish_nearest(collector)
    }

    pub(crate) fn k_nearest_brute_force(&self, k: usize) -> Vec<NodeInfo<D, P>> {
        let k = k.min(self.store.len());
        if k == 0 {
            return vec![];
        }
        let mut collector = KNearest::new(k);
        self.scan(&mut collector);
        self.finish_k_nearest(collector)
    }

    pub(crate) fn in_sphere_brute_force(&self, radius: f64) -> Vec<NodeInfo<D, P>> {
        let mut collector = InSphere::new(radius);
        self.scan(&mut collector);
        self.finish_in_sphere(collector)
    }

    fn info(&self, handle: S::Handle, distance: f64) -> NodeInfo<D, P> {
        NodeInfo {
            value: self.store.node(handle).value().clone(),
            distance,
        }
    }

    fn finish_nearest(&self, collector: Nearest<S::Handle>) -> Result<NodeInfo<D, P>> {
        let best = collector.best.ok_or(SPTreeError::EmptyTree)?;
        Ok(self.info(best, collector.distance))
    }

    fn finish_k_nearest(&self, collector: KNearest<S::Handle>) -> Vec<NodeInfo<D, P>> {
        collector
            .queue
            .into_sorted_vec()
            .into_iter()
            .map(|c| self.info(c.handle, c.distance))
            .collect()
    }

    fn finish_in_sphere(&self, collector: InSphere<S::Handle>) -> Vec<NodeInfo<D, P>> {
        let mut found = collector.found;
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
            .into_iter()
            .map(|(handle, distance)| self.info(handle, distance))
            .collect()
    }

    /// Pruned descent from the root.
    fn run<C: Collector<S::Handle>>(&self, collector: &mut C) {
        if let Some(root) = self.store.root() {
            self.descend(root, collector);
        }
    }

    fn descend<C: Collector<S::Handle>>(&self, handle: S::Handle, collector: &mut C) {
        let node = self.store.node(handle);
        self.stats.visit();

        match node.split() {
            Split::Axis(axis) => {
                let axis = *axis;
                let distance = node.point().distance(self.point);
                self.stats.candidate(collector.offer(handle, distance));

                let (near, far) = if self.point.x(axis) < node.point().x(axis) {
                    (node.left(), node.right())
                } else {
                    (node.right(), node.left())
                };

                if let Some(near) = near {
                    self.descend(near, collector);
                }
                if let Some(far) = far {
                    if collector.reaches(node.point().axis_distance(self.point, axis)) {
                        self.stats.cross_over();
                        self.descend(far, collector);
                    }
                }
            }
            Split::Plane { plane, .. } => {
                if node.is_leaf() {
                    let distance = node.point().distance(self.point);
                    self.stats.candidate(collector.offer(handle, distance));
                    return;
                }

                let position = plane.position(self.point);
                let (near, far) = if position <= 0.0 {
                    (node.left(), node.right())
                } else {
                    (node.right(), node.left())
                };

                if let Some(near) = near {
                    self.descend(near, collector);
                }
                if let Some(far) = far {
                    let dist = self.store.node(far).dist_to_parent_plane().unwrap_or(0.0);
                    if collector.reaches(position.abs() + dist) {
                        self.stats.cross_over();
                        self.descend(far, collector);
                    }
                }
            }
        }
    }

    /// Unpruned scan over every entry.
    fn scan<C: Collector<S::Handle>>(&self, collector: &mut C) {
        let mut stack: TinyVec<[S::Handle; 32]> = TinyVec::new();
        stack.extend(self.store.root());
        while let Some(handle) = stack.pop() {
            let node = self.store.node(handle);
            self.stats.visit();
            if node.holds_entry() {
                let distance = node.point().distance(self.point);
                self.stats.candidate(collector.offer(handle, distance));
            }
            stack.extend(node.right());
            stack.extend(node.left());
        }
    }
}
