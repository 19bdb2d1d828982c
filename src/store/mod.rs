//! # State Store Trait
//!
//! The persistence contract. The core never does I/O on its own; callers
//! take a [`CodexState`] snapshot and hand it to a store after decisions
//! are produced.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, for tests and embedding |

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CodexConfig;
use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

/// Snapshot format version written by this crate.
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// CodexState
// ============================================================================

/// Everything needed to rebuild a codex: axes, nodes with their axis values,
/// edges, decisions and fields. Collections are sorted so two snapshots of
/// the same state serialize identically apart from timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub config: CodexConfig,
    pub axes: Vec<VibrationalAxis>,
    /// Graph mutation counter at snapshot time.
    #[serde(default)]
    pub revision: u64,
    pub nodes: Vec<FractalNode>,
    pub edges: Vec<PartEdge>,
    #[serde(default)]
    pub decisions: Vec<GovernanceDecision>,
    #[serde(default)]
    pub fields: Vec<CoherenceField>,
}

impl CodexState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(json)?;
        if state.version > STATE_VERSION {
            return Err(crate::Error::InvalidValue(format!(
                "state version {} is newer than supported version {STATE_VERSION}",
                state.version
            )));
        }
        Ok(state)
    }
}

// ============================================================================
// StateStore Trait
// ============================================================================

/// Where snapshots go.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// The most recently saved state, if any.
    async fn load_state(&self) -> Result<Option<CodexState>>;

    /// Persist a snapshot, replacing whatever was there.
    async fn save_state(&self, state: &CodexState) -> Result<()>;

    /// Flush and release resources.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
