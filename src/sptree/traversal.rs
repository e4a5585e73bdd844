//! Utilities to traverse a tree's nodes directly.

use std::borrow::Cow;
use std::marker::PhantomData;

use tinyvec::TinyVec;

use crate::error::Result;
use crate::point::Point;
use crate::store::{Node, NodeStore, Split};
use crate::value::Value;

/// A node of a tree, for hand-written traversals.
#[derive(Debug)]
pub struct NodeRef<'a, const D: usize, P, S: NodeStore<D, P>>
where
    P: Clone,
{
    store: &'a S,
    handle: S::Handle,
    depth: usize,
    phantom: PhantomData<P>,
}

impl<'a, const D: usize, P: Clone, S: NodeStore<D, P>> NodeRef<'a, D, P, S> {
    pub(crate) fn new(store: &'a S, handle: S::Handle, depth: usize) -> Self {
        Self {
            store,
            handle,
            depth,
            phantom: PhantomData,
        }
    }

    /// The store handle of this node.
    pub fn handle(&self) -> S::Handle {
        self.handle
    }

    /// Depth below the root, which is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node(&self) -> Cow<'a, Node<D, P, S::Handle>> {
        self.store.node(self.handle)
    }

    pub fn value(&self) -> Value<D, P> {
        self.node().value().clone()
    }

    pub fn point(&self) -> Point<D> {
        *self.node().point()
    }

    pub fn split(&self) -> Split<D> {
        *self.node().split()
    }

    /// The child node on the lower side of the split, if any.
    pub fn left_child(&self) -> Option<NodeRef<'a, D, P, S>> {
        self.node()
            .left()
            .map(|handle| Self::new(self.store, handle, self.depth + 1))
    }

    /// The child node on the upper side of the split, if any.
    pub fn right_child(&self) -> Option<NodeRef<'a, D, P, S>> {
        self.node()
            .right()
            .map(|handle| Self::new(self.store, handle, self.depth + 1))
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }
}

impl<const D: usize, P: Clone, S: NodeStore<D, P>> Clone for NodeRef<'_, D, P, S> {
    fn clone(&self) -> Self {
        Self::new(self.store, self.handle, self.depth)
    }
}

/// Callbacks for [`SPTreeIndex::visit`][crate::SPTreeIndex::visit].
///
/// Nodes are visited in preorder; `leave` is called once both subtrees are done. `leaf` tells
/// whether the node has no children.
pub trait Visitor<const D: usize, P> {
    fn enter(&mut self, value: &Value<D, P>, leaf: bool, depth: usize);

    fn leave(&mut self, _value: &Value<D, P>, _leaf: bool, _depth: usize) {}
}

pub(crate) fn visit<const D: usize, P: Clone, S: NodeStore<D, P>>(
    store: &S,
    handle: S::Handle,
    depth: usize,
    visitor: &mut impl Visitor<D, P>,
) {
    let node = store.node(handle);
    let leaf = node.is_leaf();
    visitor.enter(node.value(), leaf, depth);
    if let Some(left) = node.left() {
        visit(store, left, depth + 1, visitor);
    }
    if let Some(right) = node.right() {
        visit(store, right, depth + 1, visitor);
    }
    visitor.leave(node.value(), leaf, depth);
}

/// Handles of every node below the root, in preorder.
fn preorder<const D: usize, P: Clone, S: NodeStore<D, P>>(store: &S) -> Vec<S::Handle> {
    let mut order = Vec::with_capacity(store.len());
    let mut stack: TinyVec<[S::Handle; 32]> = TinyVec::new();
    stack.extend(store.root());
    while let Some(handle) = stack.pop() {
        let node = store.node(handle);
        order.push(handle);
        stack.extend(node.right());
        stack.extend(node.left());
    }
    order
}

/// Thread every node's `next` handle through the preorder, and mark the store linked.
pub(crate) fn link_nodes<const D: usize, P: Clone, S: NodeStore<D, P>>(
    store: &mut S,
) -> Result<()> {
    let order = preorder(store);
    for pair in order.windows(2) {
        store.set_next(pair[0], Some(pair[1]))?;
    }
    if let Some(last) = order.last() {
        store.set_next(*last, None)?;
    }
    store.set_linked(true)
}

enum Cursor<H: Default> {
    Linked(Option<H>),
    Stack(TinyVec<[H; 32]>),
}

/// Iterator over the entries of a tree, in preorder.
///
/// Follows the `next` linkage when the store has it, otherwise walks the tree with an explicit
/// stack.
pub struct Iter<'a, const D: usize, P, S: NodeStore<D, P>>
where
    P: Clone,
{
    store: &'a S,
    cursor: Cursor<S::Handle>,
    phantom: PhantomData<P>,
}

impl<'a, const D: usize, P: Clone, S: NodeStore<D, P>> Iter<'a, D, P, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        let cursor = if store.is_linked() {
            Cursor::Linked(store.root())
        } else {
            let mut stack = TinyVec::new();
            stack.extend(store.root());
            Cursor::Stack(stack)
        };
        Self {
            store,
            cursor,
            phantom: PhantomData,
        }
    }

    fn next_node(&mut self) -> Option<Cow<'a, Node<D, P, S::Handle>>> {
        match &mut self.cursor {
            Cursor::Linked(next) => {
                let node = self.store.node((*next)?);
                *next = node.next();
                Some(node)
            }
            Cursor::Stack(stack) => {
                let node = self.store.node(stack.pop()?);
                stack.extend(node.right());
                stack.extend(node.left());
                Some(node)
            }
        }
    }
}

impl<'a, const D: usize, P: Clone + 'a, S: NodeStore<D, P>> Iterator for Iter<'a, D, P, S>
where
    S::Handle: 'a,
{
    type Item = Value<D, P>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.next_node()?;
            if node.holds_entry() {
                return Some(node.value().clone());
            }
        }
    }
}
