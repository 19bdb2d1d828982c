//! In-memory state store.
//!
//! Reference implementation of [`StateStore`]. Snapshots are held as JSON
//! text so a save/load cycle exercises the same serialization path a real
//! store would. Clones share the same slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{CodexState, StateStore};
use crate::{Error, Result};

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    slot: RwLock<Option<String>>,
    saves: AtomicU64,
    closed: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::Relaxed)
    }

    /// The raw JSON of the last save.
    pub fn raw(&self) -> Option<String> {
        self.inner.slot.read().clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.inner.closed.read() {
            return Err(Error::Storage("memory store is shut down".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("saves", &self.save_count())
            .field("has_state", &self.inner.slot.read().is_some())
            .finish()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_state(&self) -> Result<Option<CodexState>> {
        self.ensure_open()?;
        let slot = self.inner.slot.read().clone();
        slot.as_deref().map(CodexState::from_json).transpose()
    }

    async fn save_state(&self, state: &CodexState) -> Result<()> {
        self.ensure_open()?;
        let json = state.to_json()?;
        debug!(bytes = json.len(), nodes = state.nodes.len(), "memory store save");
        *self.inner.slot.write() = Some(json);
        self.inner.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        *self.inner.closed.write() = true;
        Ok(())
    }
}
