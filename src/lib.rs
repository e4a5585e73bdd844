#![doc = include_str!("../README.md")]

pub mod bsptree;
mod error;
pub mod kdtree;
mod plane;
mod point;
mod queue;
pub mod sptree;
mod stats;
pub mod store;
mod value;

pub use bsptree::{BSPTree, BSPTreeMapped, BSPTreeMemory, KMeansBisection, Partition};
pub use error::{Result, SPTreeError};
pub use kdtree::{KDTree, KDTreeMapped, KDTreeMemory};
pub use plane::HyperPlane;
pub use point::Point;
pub use sptree::{NodeRef, SPTreeIndex, Visitor};
pub use stats::Stats;
pub use store::{HeapStore, MappedStore, NodeStore};
pub use value::{NodeInfo, Value};

#[cfg(test)]
pub(crate) mod test;
