use geo_traits::CoordTrait;
use num_traits::ToPrimitive;

use crate::error::Result;
use crate::point::Point;
use crate::sptree::search::Search;
use crate::sptree::traversal::{self, Iter, NodeRef, Visitor};
use crate::stats::Stats;
use crate::store::NodeStore;
use crate::value::NodeInfo;

/// A trait for searching and accessing data out of a space-partition tree.
///
/// Everything here is written against the tree's [`NodeStore`], so KD and BSP trees on either
/// backend share one implementation.
pub trait SPTreeIndex<const D: usize, P: Clone>: Sized {
    /// The storage backend holding this tree's nodes.
    type Store: NodeStore<D, P>;

    /// The underlying node store of this tree
    fn store(&self) -> &Self::Store;

    /// The search counters of this tree
    fn stats(&self) -> &Stats;

    /// Find the entry closest to `point`.
    ///
    /// Returns [`SPTreeError::EmptyTree`][crate::SPTreeError::EmptyTree] if the tree has no
    /// entries.
    fn nearest_neighbour(&self, point: &Point<D>) -> Result<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).nearest()
    }

    /// Find the entry closest to a coordinate.
    fn nearest_neighbour_coord<C>(&self, coord: &C) -> Result<NodeInfo<D, P>>
    where
        C: CoordTrait,
        C::T: ToPrimitive,
    {
        self.nearest_neighbour(&Point::from_coord(coord))
    }

    /// Find the `k` entries closest to `point`, closest first.
    ///
    /// Returns `min(k, n)` entries. Ties at the cut-off are broken arbitrarily.
    fn k_nearest_neighbours(&self, point: &Point<D>, k: usize) -> Vec<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).k_nearest(k)
    }

    /// Find every entry within `radius` of `point`, closest first.
    fn find_in_sphere(&self, point: &Point<D>, radius: f64) -> Vec<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).in_sphere(radius)
    }

    /// [`nearest_neighbour`](Self::nearest_neighbour) without pruning, checking every entry.
    fn nearest_neighbour_brute_force(&self, point: &Point<D>) -> Result<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).nearest_brute_force()
    }

    /// [`k_nearest_neighbours`](Self::k_nearest_neighbours) without pruning.
    fn k_nearest_neighbours_brute_force(
        &self,
        point: &Point<D>,
        k: usize,
    ) -> Vec<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).k_nearest_brute_force(k)
    }

    /// [`find_in_sphere`](Self::find_in_sphere) without pruning.
    fn find_in_sphere_brute_force(&self, point: &Point<D>, radius: f64) -> Vec<NodeInfo<D, P>> {
        Search::new(self.store(), self.stats(), point).in_sphere_brute_force(radius)
    }

    /// The number of entries in this tree
    fn size(&self) -> usize {
        self.iter().count()
    }

    fn is_empty(&self) -> bool {
        self.store().root().is_none()
    }

    /// Iterate over the entries in preorder.
    fn iter(&self) -> Iter<'_, D, P, Self::Store> {
        Iter::new(self.store())
    }

    /// Walk every node, entries and routing nodes alike, calling the visitor on the way in and
    /// out.
    fn visit(&self, visitor: &mut impl Visitor<D, P>) {
        if let Some(root) = self.store().root() {
            traversal::visit(self.store(), root, 0, visitor);
        }
    }

    /// Access the root node of the tree for manual traversal.
    fn root(&self) -> Option<NodeRef<'_, D, P, Self::Store>> {
        self.store()
            .root()
            .map(|root| NodeRef::new(self.store(), root, 0))
    }

    fn stats_reset(&self) {
        self.stats().reset()
    }

    /// Log the search counters at `info` level.
    fn stats_print(&self) {
        self.stats().print()
    }
}
