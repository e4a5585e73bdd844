use std::marker::PhantomData;
use std::path::Path;

use bytemuck::Pod;

use crate::bsptree::builder;
use crate::bsptree::partition::{KMeansBisection, Partition};
use crate::error::{Result, SPTreeError};
use crate::sptree::traversal::link_nodes;
use crate::sptree::SPTreeIndex;
use crate::stats::Stats;
use crate::store::{HeapStore, MappedStore, NodeStore};
use crate::value::Value;

/// A binary space partition tree over `D`-dimensional points carrying payloads of type `P`.
///
/// Each internal node splits its subset with a hyperplane chosen by the [`Partition`] strategy
/// `T`, k-means bisection by default. Entries live in the leaves only, so a tree of `n` values
/// has `2n - 1` nodes.
#[derive(Debug)]
pub struct BSPTree<const D: usize, P: Clone, S = HeapStore<D, P>, T = KMeansBisection> {
    pub(crate) store: S,
    partition: T,
    pub(crate) stats: Stats,
    phantom: PhantomData<P>,
}

/// A BSP tree held in memory.
pub type BSPTreeMemory<const D: usize, P> = BSPTree<D, P, HeapStore<D, P>>;

/// A BSP tree held in a memory-mapped file.
pub type BSPTreeMapped<const D: usize, P> = BSPTree<D, P, MappedStore<D, P>>;

impl<const D: usize, P: Clone, S: NodeStore<D, P>, T: Partition<D>> BSPTree<D, P, S, T> {
    /// Wrap an existing store. Any tree already in the store is kept.
    pub fn with_store(store: S, partition: T) -> Self {
        Self {
            store,
            partition,
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
    pub fn build(&mut self, values: Vec<Value<D, P>>) -> Result<()> {
        if !self.store.is_writable() {
            return Err(SPTreeError::ReadOnly);
        }
        if let Some(root) = self.store.root() {
            self.store.destroy(root);
            self.store.set_root(None)?;
        }

        let len = values.len();
        let root = builder::build(
            &mut self.store,
            &mut self.partition,
            values,
            0.0,
            0,
            &self.stats,
        )?;
        self.store.set_root(root)?;
        link_nodes(&mut self.store)?;

        log::debug!(
            "Built BSP tree of {} values, depth {}",
            len,
            self.stats.depth()
        );
        Ok(())
    }

    /// Make all writes durable.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}

impl<const D: usize, P: Clone> BSPTree<D, P> {
    /// Create an empty in-memory tree, partitioned by a k-means bisection seeded from entropy.
    pub fn new() -> Self {
        Self::with_store(HeapStore::new(), KMeansBisection::new())
    }
}

impl<const D: usize, P: Clone> Default for BSPTree<D, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize, P: Clone, T: Partition<D>> BSPTree<D, P, HeapStore<D, P>, T> {
    /// Create an empty in-memory tree with the given partition strategy.
    pub fn with_partition(partition: T) -> Self {
        Self::with_store(HeapStore::new(), partition)
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl<const D: usize, P: Pod> BSPTree<D, P, MappedStore<D, P>> {
    /// Create a new tree file with room for `item_count` nodes and `metadata_size` bytes of
    /// metadata. Building from `n` values takes `2n - 1` nodes.
    pub fn create(path: impl AsRef<Path>, item_count: usize, metadata_size: usize) -> Result<Self> {
        Ok(Self::with_store(
            MappedStore::create(path, item_count, metadata_size)?,
            KMeansBisection::new(),
        ))
    }

    /// Open an existing tree file for querying.
    pub fn open(path: impl AsRef<Path>, metadata_size: usize) -> Result<Self> {
        Ok(Self::with_store(
            MappedStore::open(path, metadata_size)?,
            KMeansBisection::new(),
        ))
    }

    /// Open the tree file at `path` if it exists, otherwise create an empty one.
    pub fn open_or_create(
        path: impl AsRef<Path>,
        item_count: usize,
        metadata_size: usize,
    ) -> Result<Self> {
        Ok(Self::with_store(
            MappedStore::open_or_create(path, item_count, metadata_size)?,
            KMeansBisection::new(),
        ))
    }
}

impl<const D: usize, P: Pod, T> BSPTree<D, P, MappedStore<D, P>, T> {
    pub fn read_metadata<M: Pod>(&self) -> Result<M> {
        self.store.read_metadata()
    }

    pub fn write_metadata<M: Pod>(&mut self, value: &M) -> Result<()> {
        self.store.write_metadata(value)
    }
}

impl<const D: usize, P: Clone, S: NodeStore<D, P>, T> SPTreeIndex<D, P> for BSPTree<D, P, S, T> {
    type Store = S;

    fn store(&self) -> &S {
        &self.store
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
