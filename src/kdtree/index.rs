use std::marker::PhantomData;
use std::path::Path;

use bytemuck::Pod;

use crate::error::{Result, SPTreeError};
use crate::kdtree::builder;
use crate::sptree::traversal::link_nodes;
use crate::sptree::SPTreeIndex;
use crate::stats::Stats;
use crate::store::{HeapStore, MappedStore, NodeStore};
use crate::value::Value;

/// A KD tree over `D`-dimensional points carrying payloads of type `P`.
///
/// Nodes live in a [`NodeStore`]; by default an in-memory [`HeapStore`]. Build the tree once
/// with [`build`](Self::build), or grow it one value at a time with [`insert`](Self::insert).
#[derive(Debug)]
pub struct KDTree<const D: usize, P: Clone, S = HeapStore<D, P>> {
    pub(crate) store: S,
    pub(crate) stats: Stats,
    phantom: PhantomData<P>,
}

/// A KD tree held in memory.
pub type KDTreeMemory<const D: usize, P> = KDTree<D, P, HeapStore<D, P>>;

/// A KD tree held in a memory-mapped file.
pub type KDTreeMapped<const D: usize, P> = KDTree<D, P, MappedStore<D, P>>;

impl<const D: usize, P: Clone, S: NodeStore<D, P>> KDTree<D, P, S> {
    /// Wrap an existing store. Any tree already in the store is kept.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            stats: Stats::new(),
            phantom: PhantomData,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Build the tree from `values`, replacing any tree already built.
    ///
    /// Stores that can't reclaim nodes (the mapped arena) keep the old nodes' slots in use.
    pub fn build(&mut self, mut values: Vec<Value<D, P>>) -> Result<()> {
        if !self.store.is_writable() {
            return Err(SPTreeError::ReadOnly);
        }
        if let Some(root) = self.store.root() {
            self.store.destroy(root);
            self.store.set_root(None)?;
        }

        let root = builder::build(&mut self.store, &mut values, 0, &self.stats)?;
        self.store.set_root(root)?;
        link_nodes(&mut self.store)?;

        log::debug!(
            "Built KD tree of {} values, depth {}",
            values.len(),
            self.stats.depth()
        );
        Ok(())
    }

    /// Add one value to the tree.
    ///
    /// The tree is not rebalanced, so inserting sorted data degrades queries towards a linear
    /// scan.
    pub fn insert(&mut self, value: Value<D, P>) -> Result<()> {
        builder::insert(&mut self.store, value, &self.stats)?;
        Ok(())
    }

    /// Make all writes durable.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}

impl<const D: usize, P: Clone> KDTree<D, P, HeapStore<D, P>> {
    /// Create an empty in-memory tree.
    pub fn new() -> Self {
        Self::with_store(HeapStore::new())
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl<const D: usize, P: Clone> Default for KDTree<D, P, HeapStore<D, P>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize, P: Pod> KDTree<D, P, MappedStore<D, P>> {
    /// Create a new tree file with room for `item_count` values and `metadata_size` bytes of
    /// metadata.
    pub fn create(path: impl AsRef<Path>, item_count: usize, metadata_size: usize) -> Result<Self> {
        Ok(Self::with_store(MappedStore::create(
            path,
            item_count,
            metadata_size,
        )?))
    }

    /// Open an existing tree file for querying.
    pub fn open(path: impl AsRef<Path>, metadata_size: usize) -> Result<Self> {
        Ok(Self::with_store(MappedStore::open(path, metadata_size)?))
    }

    /// Open the tree file at `path` if it exists, otherwise create an empty one.
    pub fn open_or_create(
        path: impl AsRef<Path>,
        item_count: usize,
        metadata_size: usize,
    ) -> Result<Self> {
        Ok(Self::with_store(MappedStore::open_or_create(
            path,
            item_count,
            metadata_size,
        )?))
    }

    pub fn read_metadata<M: Pod>(&self) -> Result<M> {
        self.store.read_metadata()
    }

    pub fn write_metadata<M: Pod>(&mut self, value: &M) -> Result<()> {
        self.store.write_metadata(value)
    }
}

impl<const D: usize, P: Clone, S: NodeStore<D, P>> SPTreeIndex<D, P> for KDTree<D, P, S> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
