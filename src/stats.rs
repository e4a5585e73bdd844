//! Search and build counters.

use std::cell::Cell;
use std::fmt;

/// Counters updated by every query on a tree.
///
/// Queries take `&self`, so the counters are [`Cell`]s. A tree is therefore `Send` but not
/// `Sync`.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    visits: Cell<u64>,
    candidates: Cell<u64>,
    misses: Cell<u64>,
    cross_overs: Cell<u64>,
    depth: Cell<u64>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes visited by queries.
    pub fn visits(&self) -> u64 {
        self.visits.get()
    }

    /// Number of entries that improved or joined a query's result.
    pub fn candidates(&self) -> u64 {
        self.candidates.get()
    }

    /// Number of entries looked at and rejected.
    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Number of times a query had to descend into the far side of a split.
    pub fn cross_overs(&self) -> u64 {
        self.cross_overs.get()
    }

    /// Deepest level reached while building.
    pub fn depth(&self) -> u64 {
        self.depth.get()
    }

    pub(crate) fn visit(&self) {
        bump(&self.visits);
    }

    pub(crate) fn candidate(&self, accepted: bool) {
        if accepted {
            bump(&self.candidates);
        } else {
            bump(&self.misses);
        }
    }

    pub(crate) fn cross_over(&self) {
        bump(&self.cross_overs);
    }

    pub(crate) fn record_depth(&self, depth: usize) {
        self.depth.set(self.depth.get().max(depth as u64));
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.visits.set(0);
        self.candidates.set(0);
        self.misses.set(0);
        self.cross_overs.set(0);
        self.depth.set(0);
    }

    /// Write the counters to the `info` log.
    pub fn print(&self) {
        log::info!("{}", self);
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visits: {}, candidates: {}, misses: {}, cross-overs: {}, depth: {}",
            self.visits(),
            self.candidates(),
            self.misses(),
            self.cross_overs(),
            self.depth()
        )
    }
}
