//! Exploration strategies.
//!
//! Decisions are deterministic. Choosing *where to look next* among
//! cross-scale candidates is not part of that contract, so it lives behind a
//! trait the caller picks.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::graph::CrossScaleMatch;

pub trait ExplorationStrategy: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Pick one candidate. Candidates arrive best first.
    fn choose<'a>(&self, candidates: &'a [CrossScaleMatch]) -> Option<&'a CrossScaleMatch>;
}

/// Always the best candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl ExplorationStrategy for FirstCandidate {
    fn name(&self) -> &str {
        "first-candidate"
    }

    fn choose<'a>(&self, candidates: &'a [CrossScaleMatch]) -> Option<&'a CrossScaleMatch> {
        candidates.first()
    }
}

/// Cycles through candidates on successive calls.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExplorationStrategy for RoundRobin {
    fn name(&self) -> &str {
        "round-robin"
    }

    fn choose<'a>(&self, candidates: &'a [CrossScaleMatch]) -> Option<&'a CrossScaleMatch> {
        if candidates.is_empty() {
            return None;
        }
        let turn = self.cursor.fetch_add(1, Ordering::Relaxed);
        candidates.get(turn % candidates.len())
    }
}
