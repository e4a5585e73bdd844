//! The query surface shared by every tree.

pub(crate) mod search;
mod r#trait;
pub(crate) mod traversal;

pub use r#trait::SPTreeIndex;
pub use traversal::{Iter, NodeRef, Visitor};
