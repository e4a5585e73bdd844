use std::fmt::Debug;
use std::path::PathBuf;

use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum SPTreeError {
    #[error("General error: {0}")]
    General(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Header mismatch in {}: {field} is {found}, expected {expected}.", path.display())]
    HeaderMismatch {
        path: PathBuf,
        field: &'static str,
        found: u64,
        expected: u64,
    },

    #[error("Invalid node record in {}: slot {slot} has {field} {found}.", path.display())]
    InvalidRecord {
        path: PathBuf,
        slot: u64,
        field: &'static str,
        found: u64,
    },

    #[error("Arena exhausted: all {capacity} node slots are in use.")]
    ArenaExhausted { capacity: usize },

    #[error("Node store is read-only.")]
    ReadOnly,

    #[error("Query on an empty tree.")]
    EmptyTree,

    #[error("Degenerate partition: {left} points on the left, {right} on the right.")]
    DegeneratePartition { left: usize, right: usize },

    #[error("Metadata block holds {available} bytes, {requested} requested.")]
    MetadataSize { available: usize, requested: usize },
}

impl SPTreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SPTreeError>;
