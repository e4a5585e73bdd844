use bytemuck::{Pod, Zeroable};

use crate::point::Point;

/// Fixed header at offset 0 of a mapped tree file.
///
/// The first four fields describe the layout and are validated on reopen; the rest is the
/// arena's state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct Header {
    pub(crate) header_size: u64,
    pub(crate) item_count: u64,
    pub(crate) item_size: u64,
    pub(crate) metadata_size: u64,
    /// Number of slots handed out so far.
    pub(crate) len: u64,
    /// Slot of the root node, 0 if the tree is empty.
    pub(crate) root: u64,
    pub(crate) flags: u64,
}

pub(crate) const HEADER_SIZE: usize = std::mem::size_of::<Header>();

/// `next` handles are valid for every node.
pub(crate) const FLAG_LINKED: u64 = 1;

pub(crate) const KIND_AXIS: u64 = 0;
pub(crate) const KIND_PLANE: u64 = 1;

/// On-disk form of a node, without its payload. The payload bytes follow the record.
///
/// Handles are slot numbers with 0 meaning null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeRecord<const D: usize> {
    pub(crate) point: Point<D>,
    pub(crate) normal: Point<D>,
    pub(crate) offset: f64,
    pub(crate) dist: f64,
    pub(crate) axis: u64,
    pub(crate) kind: u64,
    pub(crate) left: u64,
    pub(crate) right: u64,
    pub(crate) next: u64,
}

// SAFETY: `repr(C)` with only 8-byte fields, so there is no padding, and every bit pattern of
// `f64`/`u64` is valid.
unsafe impl<const D: usize> Zeroable for NodeRecord<D> {}
unsafe impl<const D: usize> Pod for NodeRecord<D> {}

pub(crate) const fn record_size<const D: usize>() -> usize {
    std::mem::size_of::<NodeRecord<D>>()
}
