//! A KD tree: every node holds one entry and splits space on one coordinate axis.
//!
//! The axis cycles with depth and each node is the median of its subtree along that axis, found
//! by selection rather than sorting.

mod builder;
mod index;

pub use index::{KDTree, KDTreeMapped, KDTreeMemory};

#[cfg(test)]
mod test;
