//! Node storage.
//!
//! Every tree in this crate is written once against the [`NodeStore`] trait and never sees how
//! its nodes are laid out. [`HeapStore`] keeps nodes in an ordinary growable arena, while
//! [`MappedStore`] keeps fixed-size node records in a memory-mapped file that can be reopened,
//! read-only, by other processes.

use std::borrow::Cow;
use std::fmt::Debug;

use crate::error::Result;
use crate::plane::HyperPlane;
use crate::point::Point;
use crate::value::Value;

pub(crate) mod constants;
mod heap;
mod mapped;

pub use heap::{HeapHandle, HeapStore};
pub use mapped::{MappedStore, Slot};

/// How a node divides the space below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Split<const D: usize> {
    /// KD split: children are ordered by the coordinate along this axis.
    Axis(usize),
    /// BSP split: children lie on either side of `plane`. `dist` is the smallest distance from
    /// any point below this node to the **parent's** plane.
    Plane { plane: HyperPlane<D>, dist: f64 },
}

/// Which child of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A tree node as seen through a [`NodeStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node<const D: usize, P, H> {
    pub(crate) value: Value<D, P>,
    pub(crate) split: Split<D>,
    pub(crate) left: Option<H>,
    pub(crate) right: Option<H>,
    pub(crate) next: Option<H>,
}

impl<const D: usize, P, H: Copy> Node<D, P, H> {
    pub(crate) fn new(value: Value<D, P>, split: Split<D>) -> Self {
        Self {
            value,
            split,
            left: None,
            right: None,
            next: None,
        }
    }

    pub fn value(&self) -> &Value<D, P> {
        &self.value
    }

    pub fn point(&self) -> &Point<D> {
        &self.value.point
    }

    pub fn split(&self) -> &Split<D> {
        &self.split
    }

    pub fn left(&self) -> Option<H> {
        self.left
    }

    pub fn right(&self) -> Option<H> {
        self.right
    }

    pub fn child(&self, side: Side) -> Option<H> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// The next node in the linked preorder, once the store's linkage has been built.
    pub fn next(&self) -> Option<H> {
        self.next
    }

    /// The KD split axis, if this is a KD node.
    pub fn axis(&self) -> Option<usize> {
        match self.split {
            Split::Axis(axis) => Some(axis),
            Split::Plane { .. } => None,
        }
    }

    /// The BSP splitting plane, if this is a BSP node.
    pub fn plane(&self) -> Option<&HyperPlane<D>> {
        match &self.split {
            Split::Axis(_) => None,
            Split::Plane { plane, .. } => Some(plane),
        }
    }

    /// Smallest distance from the points below this node to the parent's plane (BSP only).
    pub fn dist_to_parent_plane(&self) -> Option<f64> {
        match self.split {
            Split::Axis(_) => None,
            Split::Plane { dist, .. } => Some(dist),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Whether this node's value is one of the indexed entries.
    ///
    /// Every KD node holds an entry. BSP internal nodes only route queries and carry a copy of
    /// a value from their subtree, so only BSP leaves count.
    #[inline]
    pub fn holds_entry(&self) -> bool {
        match self.split {
            Split::Axis(_) => true,
            Split::Plane { .. } => self.is_leaf(),
        }
    }
}

/// Owner of all the nodes of one tree.
///
/// Handles are opaque; a null handle is `None`. Mutating operations return
/// [`SPTreeError::ReadOnly`][crate::SPTreeError::ReadOnly] on stores opened for reading only.
pub trait NodeStore<const D: usize, P: Clone> {
    /// A reference to one node in this store.
    type Handle: Copy + Eq + Debug + Default;

    /// Allocate a new childless node.
    fn alloc(&mut self, value: Value<D, P>, split: Split<D>) -> Result<Self::Handle>;

    /// Dereference a handle. Stores that can't lend out their nodes return a decoded copy.
    fn node(&self, handle: Self::Handle) -> Cow<'_, Node<D, P, Self::Handle>>;

    fn set_child(
        &mut self,
        handle: Self::Handle,
        side: Side,
        child: Option<Self::Handle>,
    ) -> Result<()>;

    fn set_next(&mut self, handle: Self::Handle, next: Option<Self::Handle>) -> Result<()>;

    fn root(&self) -> Option<Self::Handle>;

    fn set_root(&mut self, root: Option<Self::Handle>) -> Result<()>;

    /// Whether every node's `next` handle is up to date.
    fn is_linked(&self) -> bool;

    fn set_linked(&mut self, linked: bool) -> Result<()>;

    /// The number of live nodes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_writable(&self) -> bool {
        true
    }

    /// Release the subtree below `root`, if this store can reclaim nodes at all.
    fn destroy(&mut self, root: Self::Handle);

    /// Make all writes durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
