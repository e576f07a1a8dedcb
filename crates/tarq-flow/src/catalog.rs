//! Durable scene catalog backing store.
//!
//! The catalog is the ever-growing record of scenes already ingested,
//! stored as a gzip-compressed, newline-delimited CSV under
//! [`IngestPaths::SCENE_CATALOG`]. The first line is a header row; every
//! subsequent line is one scene row whose first comma-separated field is
//! the scene identifier.
//!
//! The catalog is seeded at system bootstrap and append-only afterwards.
//! Appends are read-modify-write; the single-writer discipline of the
//! orchestration loop keeps that safe.

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use tarq_core::{Error as CoreError, IngestPaths, StorageBackend, WritePrecondition};

use crate::error::Result;

/// Handle to the durable scene catalog.
pub struct SceneCatalog {
    storage: Arc<dyn StorageBackend>,
}

impl SceneCatalog {
    /// Creates a catalog handle over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Loads scene identifiers from the catalog.
    ///
    /// Skips the header row and takes the first comma-separated field of
    /// each remaining row.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog key is missing or unreadable,
    /// or a serialization error if the payload is not valid gzip text.
    pub async fn load(&self) -> Result<Vec<String>> {
        let compressed = self.storage.get(IngestPaths::SCENE_CATALOG).await?;
        let text = gunzip(&compressed)?;

        Ok(text
            .lines()
            .skip(1)
            .filter_map(|line| line.split(',').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Appends scene rows to the catalog.
    ///
    /// `rows` are full CSV rows (not bare identifiers); the header row is
    /// preserved as-is. A no-op for an empty slice.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error; on error nothing is
    /// written.
    pub async fn append(&self, rows: &[String]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let compressed = self.storage.get(IngestPaths::SCENE_CATALOG).await?;
        let mut text = gunzip(&compressed)?;

        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }

        let payload = gzip(&text)?;
        self.storage
            .put(IngestPaths::SCENE_CATALOG, payload, WritePrecondition::None)
            .await?;

        tracing::debug!(rows = rows.len(), "appended rows to scene catalog");
        Ok(())
    }
}

fn gunzip(compressed: &Bytes) -> Result<String> {
    let mut decoder = GzDecoder::new(compressed.as_ref());
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| CoreError::serialization(format!("catalog is not valid gzip text: {e}")))?;
    Ok(text)
}

fn gzip(text: &str) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .and_then(|()| encoder.finish())
        .map(Bytes::from)
        .map_err(|e| CoreError::serialization(format!("failed to gzip catalog: {e}")).into())
}
