use std::borrow::Cow;

use tinyvec::TinyVec;

use crate::error::Result;
use crate::store::{Node, NodeStore, Side, Split};
use crate::value::Value;

/// Index of a node in a [`HeapStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct HeapHandle(pub(crate) usize);

/// An in-memory node arena.
///
/// Nodes live in a `Vec`; freed slots are recycled through a free list. Destroying a node frees
/// its whole subtree.
#[derive(Debug, Clone)]
pub struct HeapStore<const D: usize, P> {
    nodes: Vec<Option<Node<D, P, HeapHandle>>>,
    free: Vec<usize>,
    root: Option<HeapHandle>,
    linked: bool,
}

impl<const D: usize, P> HeapStore<D, P> {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            free: vec![],
            root: None,
            linked: false,
        }
    }

    /// Create an empty store with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    fn get(&self, handle: HeapHandle) -> &Node<D, P, HeapHandle> {
        match self.nodes.get(handle.0) {
            Some(Some(node)) => node,
            _ => panic!("Dangling heap handle {:?}", handle),
        }
    }

    fn get_mut(&mut self, handle: HeapHandle) -> &mut Node<D, P, HeapHandle> {
        match self.nodes.get_mut(handle.0) {
            Some(Some(node)) => node,
            _ => panic!("Dangling heap handle {:?}", handle),
        }
    }
}

impl<const D: usize, P> Default for HeapStore<D, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize, P: Clone> NodeStore<D, P> for HeapStore<D, P> {
    type Handle = HeapHandle;

    fn alloc(&mut self, value: Value<D, P>, split: Split<D>) -> Result<HeapHandle> {
        let node = Some(Node::new(value, split));
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        Ok(HeapHandle(index))
    }

    #[inline]
    fn node(&self, handle: HeapHandle) -> Cow<'_, Node<D, P, HeapHandle>> {
        Cow::Borrowed(self.get(handle))
    }

    fn set_child(
        &mut self,
        handle: HeapHandle,
        side: Side,
        child: Option<HeapHandle>,
    ) -> Result<()> {
        let node = self.get_mut(handle);
        match side {
            Side::Left => node.left = child,
            Side::Right => node.right = child,
        }
        Ok(())
    }

    fn set_next(&mut self, handle: HeapHandle, next: Option<HeapHandle>) -> Result<()> {
        self.get_mut(handle).next = next;
        Ok(())
    }

    fn root(&self) -> Option<HeapHandle> {
        self.root
    }

    fn set_root(&mut self, root: Option<HeapHandle>) -> Result<()> {
        self.root = root;
        Ok(())
    }

    fn is_linked(&self) -> bool {
        self.linked
    }

    fn set_linked(&mut self, linked: bool) -> Result<()> {
        self.linked = linked;
        Ok(())
    }

    fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn destroy(&mut self, root: HeapHandle) {
        // Explicit stack: BSP trees can be deep enough to make recursion a liability.
        let mut stack: TinyVec<[HeapHandle; 32]> = TinyVec::new();
        stack.push(root);
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle.0).and_then(Option::take) else {
                continue;
            };
            stack.extend(node.left);
            stack.extend(node.right);
            self.free.push(handle.0);
        }
        if self.root == Some(root) {
            self.root = None;
        }
        self.linked = false;
        if self.free.len() == self.nodes.len() {
            self.nodes.clear();
            self.free.clear();
        }
    }
}

impl<const D: usize, P> HeapStore<D, P> {
    /// Drop every node at once.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.linked = false;
    }
}
