//! Engine state archive
//!
//! Written once on shutdown. `JsonFileArchive` writes atomically (tmp + rename)
//! so a crash mid-write never leaves a truncated record behind.

use crate::error::AdapterResult;
use dreamcore_core::StateArchiveRecord;
use std::path::{Path, PathBuf};
use tracing::info;

#[async_trait::async_trait]
pub trait StateArchive: Send + Sync {
    async fn archive(&self, record: &StateArchiveRecord) -> AdapterResult<()>;
}

/// Archive that writes one `state-<timestamp>.json` per record.
pub struct JsonFileArchive {
    dir: PathBuf,
}

impl JsonFileArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, record: &StateArchiveRecord) -> PathBuf {
        let stamp = record.archived_at.format("%Y%m%dT%H%M%S%.3fZ");
        self.dir.join(format!("state-{}.json", stamp))
    }
}

#[async_trait::async_trait]
impl StateArchive for JsonFileArchive {
    async fn archive(&self, record: &StateArchiveRecord) -> AdapterResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(record)?;
        let path = self.record_path(record);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        info!("Archived engine state ({}) to {}", record.reason, path.display());
        Ok(())
    }
}
