//! A binary space partition tree: internal nodes split space with arbitrary hyperplanes and
//! every entry is a leaf.
//!
//! Queries prune a far subtree using the distance from the query point to the splitting plane
//! plus the smallest distance from that subtree's points to the same plane, which each node
//! records at build time.

mod builder;
mod index;
mod partition;

pub use index::{BSPTree, BSPTreeMapped, BSPTreeMemory};
pub use partition::{Bisection, KMeansBisection, Partition};
