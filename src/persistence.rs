//! Snapshot persistence for CertChain
//!
//! The ledger lives in memory; these backends only run when a caller exports
//! or imports explicitly. The on-disk form is the ordered block array as JSON,
//! the same shape `GET /api/chain` returns, and loading always goes back
//! through `ChainStore::import_chain` so a snapshot is validated before use.

use crate::blockchain::Block;
use crate::error::ChainError;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Abstraction for snapshot backends.
pub trait Persistence: Send + Sync {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError>;
    /// `Ok(None)` when nothing has been saved yet.
    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError>;
}

/// Pretty-printed JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl Persistence for JsonFilePersistence {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(blocks)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| ChainError::IoError(format!(
            "Failed to write snapshot {}: {}",
            self.path.display(),
            e.error
        )))?;

        tracing::info!(path = %self.path.display(), blocks = blocks.len(), "snapshot written");
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let blocks: Vec<Block> = serde_json::from_str(&text).map_err(|e| {
            ChainError::SerializationError(format!(
                "Failed to parse snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(blocks))
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<Mutex<Option<Vec<Block>>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_chain(&self, blocks: &[Block]) -> Result<(), ChainError> {
        *self.blocks.lock() = Some(blocks.to_vec());
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<Block>>, ChainError> {
        Ok(self.blocks.lock().clone())
    }
}
