//! Destination for per-device sync attempt records
//!
//! Every delivery attempt produces exactly one record. The sink is shared
//! between concurrent delivery tasks, so implementations take `&self`.


use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::types::SyncAttemptRecord;

/// Log sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Underlying storage failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only store of sync attempt records
#[async_trait]
pub trait SyncLogSink: Send + Sync {
    /// Append one record
    async fn record(&self, entry: SyncAttemptRecord) -> Result<(), SinkError>;

    /// All records in insertion order
    async fn records(&self) -> Result<Vec<SyncAttemptRecord>, SinkError>;
}

/// In-memory sink (non-persistent)
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: RwLock<Vec<SyncAttemptRecord>>,
}

impl MemoryLogSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been recorded yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SyncLogSink for MemoryLogSink {
    async fn record(&self, entry: SyncAttemptRecord) -> Result<(), SinkError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<SyncAttemptRecord>, SinkError> {
        Ok(self.entries.read().await.clone())
    }
}

/// File sink writing one JSON document per line
#[derive(Debug)]
pub struct JsonLinesLogSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesLogSink {
    /// Create a sink appending to `path`
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// File backing this sink
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncLogSink for JsonLinesLogSink {
    async fn record(&self, entry: SyncAttemptRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        // Lines from concurrent deliveries must not interleave
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn records(&self) -> Result<Vec<SyncAttemptRecord>, SinkError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let contents = {
            let _guard = self.write_lock.lock().await;
            tokio::fs::read_to_string(&self.path).await?
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(SinkError::from))
            .collect()
    }
}
