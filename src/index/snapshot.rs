//! On-disk snapshot of an index: configuration plus records, codec framed.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::codec::Codec;
use crate::error::{EngineError, Result};
use crate::model::{IndexConfiguration, Record};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: String,
    pub record: Record,
}

/// Everything needed to reconstruct an index. Items are in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub configuration: IndexConfiguration,
    pub items: Vec<SnapshotItem>,
}

impl IndexSnapshot {
    #[must_use]
    pub fn new(configuration: IndexConfiguration, items: Vec<SnapshotItem>) -> Self {
        Self {
            format_version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            configuration,
            items,
        }
    }

    /// Write atomically: a temp file in the target directory, then rename.
    pub fn write_to(&self, path: &Path, codec: &Codec) -> Result<()> {
        let bytes = codec.compress(self)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|err| EngineError::Io(err.error))?;
        Ok(())
    }

    pub fn read_from(path: &Path, codec: &Codec) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: Self = codec.decompress(&bytes)?;
        if snapshot.format_version != SNAPSHOT_VERSION {
            return Err(EngineError::Codec(format!(
                "unsupported snapshot version {} in {}",
                snapshot.format_version,
                path.display()
            )));
        }
        Ok(snapshot)
    }
}
