//! Run aggregation: fold per-element artifacts into one durable result.
//!
//! Each element of a completed array job leaves one artifact under the
//! job's namespace prefix: a header line, one or more entry rows, and a
//! trailing empty line. Aggregation merges them into a single result with
//! exactly one header, publishes it under the next run number, appends the
//! entry rows to the scene catalog, and only then deletes the consumed
//! artifacts.
//!
//! The deletes are the sole non-idempotent step, so they happen last: any
//! earlier failure leaves every artifact in place and the whole pass safely
//! re-runnable on the next tick. Artifact keys are sorted before the merge
//! so the retained header does not depend on the storage service's listing
//! order.

use std::sync::Arc;

use bytes::Bytes;

use tarq_core::{IngestPaths, StorageBackend, WritePrecondition};

use crate::catalog::SceneCatalog;
use crate::error::{Error, Result};
use crate::state::RunState;

/// The merged output of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRun {
    /// Durable key the merged result was published under.
    pub result_key: String,
    /// The merged text: one header plus all entry rows.
    pub merged: String,
    /// Entry rows appended to the catalog (header excluded).
    pub body_rows: Vec<String>,
    /// Number of artifacts consumed.
    pub artifact_count: usize,
}

/// Merges a completed job's artifacts and advances the durable catalog.
pub struct RunAggregator {
    storage: Arc<dyn StorageBackend>,
    catalog: SceneCatalog,
}

impl RunAggregator {
    /// Creates an aggregator over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let catalog = SceneCatalog::new(Arc::clone(&storage));
        Self { storage, catalog }
    }

    /// Aggregates every artifact under `job_id`'s namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoArtifacts`] if a complete job left no outputs
    /// (an upstream inconsistency, not an empty result), or
    /// [`Error::MalformedArtifact`] for artifacts that do not decode. Any
    /// fetch failure aborts before durable writes; the caller leaves run
    /// state unchanged and retries next tick.
    pub async fn aggregate(&self, job_id: &str, run_state: &RunState) -> Result<AggregatedRun> {
        let prefix = IngestPaths::artifact_prefix(job_id);
        let mut keys: Vec<String> = self
            .storage
            .list(&prefix)
            .await?
            .into_iter()
            .map(|meta| meta.path)
            .filter(|key| IngestPaths::is_artifact(key))
            .collect();

        if keys.is_empty() {
            return Err(Error::NoArtifacts {
                job_id: job_id.to_string(),
            });
        }

        // Listing order is not stable across backends; sort so the header
        // choice is deterministic.
        keys.sort();

        let mut header: Option<String> = None;
        let mut body_rows = Vec::new();
        for key in &keys {
            let bytes = self.storage.get(key).await?;
            let (artifact_header, rows) = split_artifact(key, &bytes)?;
            if header.is_none() {
                header = Some(artifact_header);
            }
            body_rows.extend(rows);
        }

        let header = header.ok_or_else(|| Error::NoArtifacts {
            job_id: job_id.to_string(),
        })?;

        let mut merged = header;
        for row in &body_rows {
            merged.push('\n');
            merged.push_str(row);
        }

        let result_key = IngestPaths::run_result(run_state.last_run + 1);
        self.storage
            .put(
                &result_key,
                Bytes::from(merged.clone()),
                WritePrecondition::None,
            )
            .await?;

        self.catalog.append(&body_rows).await?;

        // Cleanup happens last. Only keys listed under the job namespace
        // are touched.
        for key in &keys {
            self.storage.delete(key).await?;
        }

        tracing::info!(
            job_id = %job_id,
            result_key = %result_key,
            artifacts = keys.len(),
            rows = body_rows.len(),
            "aggregated run outputs"
        );

        Ok(AggregatedRun {
            result_key,
            merged,
            artifact_count: keys.len(),
            body_rows,
        })
    }
}

/// Splits an artifact into its header line and entry rows.
///
/// Artifacts are two-or-more-line records: header, entries, trailing empty
/// line (tolerated if absent).
fn split_artifact(key: &str, bytes: &Bytes) -> Result<(String, Vec<String>)> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::MalformedArtifact {
        key: key.to_string(),
        message: format!("not valid UTF-8: {e}"),
    })?;

    let mut lines = text.lines();
    let header = lines.next().filter(|h| !h.is_empty()).ok_or_else(|| {
        Error::MalformedArtifact {
            key: key.to_string(),
            message: "missing header line".to_string(),
        }
    })?;

    let rows: Vec<String> = lines
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if rows.is_empty() {
        return Err(Error::MalformedArtifact {
            key: key.to_string(),
            message: "no entry rows after header".to_string(),
        });
    }

    Ok((header.to_string(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tarq_core::MemoryBackend;

    const HEADER: &str = "entityId,acquisitionDate";

    async fn seed_catalog(storage: &MemoryBackend) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(format!("{HEADER}\n").as_bytes()).unwrap();
        storage
            .put(
                IngestPaths::SCENE_CATALOG,
                Bytes::from(encoder.finish().unwrap()),
                WritePrecondition::None,
            )
            .await
            .unwrap();
    }

    async fn put_artifact(storage: &MemoryBackend, key: &str, text: &str) {
        storage
            .put(key, Bytes::from(text.to_string()), WritePrecondition::None)
            .await
            .unwrap();
    }

    fn active_state(last_run: u64) -> RunState {
        RunState {
            active_run: Some("J1".to_string()),
            last_run,
        }
    }

    #[tokio::test]
    async fn merges_one_header_and_all_rows_in_key_order() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(&storage, "J1/0.csv", "h\na\n\n").await;
        put_artifact(&storage, "J1/1.csv", "h\nb\n\n").await;

        let aggregator = RunAggregator::new(storage.clone());
        let result = aggregator
            .aggregate("J1", &active_state(7))
            .await
            .expect("aggregate");

        assert_eq!(result.merged, "h\na\nb");
        assert_eq!(result.body_rows, vec!["a", "b"]);
        assert_eq!(result.artifact_count, 2);
        assert_eq!(result.result_key, "runs/8.csv");

        // Result published under the next run number.
        let published = storage.get("runs/8.csv").await.unwrap();
        assert_eq!(published, Bytes::from("h\na\nb"));

        // Both artifacts deleted.
        assert!(storage.list("J1/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_body_rows_to_catalog() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(
            &storage,
            "J1/0.csv",
            "entityId,acquisitionDate\nLC80830632019150LGN00,2019-05-30\n\n",
        )
        .await;

        let aggregator = RunAggregator::new(storage.clone());
        aggregator
            .aggregate("J1", &active_state(0))
            .await
            .expect("aggregate");

        let catalog = SceneCatalog::new(storage);
        let ids = catalog.load().await.expect("load");
        assert_eq!(ids, vec!["LC80830632019150LGN00"]);
    }

    #[tokio::test]
    async fn multi_row_artifacts_keep_per_artifact_order() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(&storage, "J1/0.csv", "h\na1\na2\n\n").await;
        put_artifact(&storage, "J1/1.csv", "h\nb1\n\n").await;

        let aggregator = RunAggregator::new(storage.clone());
        let result = aggregator
            .aggregate("J1", &active_state(0))
            .await
            .expect("aggregate");

        assert_eq!(result.body_rows, vec!["a1", "a2", "b1"]);
        assert_eq!(result.merged, "h\na1\na2\nb1");
    }

    #[tokio::test]
    async fn zero_artifacts_is_a_domain_error() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;

        let aggregator = RunAggregator::new(storage.clone());
        let err = aggregator.aggregate("J1", &active_state(0)).await.unwrap_err();
        assert!(matches!(err, Error::NoArtifacts { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn non_artifact_keys_in_namespace_are_ignored_and_kept() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(&storage, "J1/0.csv", "h\na\n\n").await;
        put_artifact(&storage, "J1/debug.log", "not an artifact").await;

        let aggregator = RunAggregator::new(storage.clone());
        let result = aggregator
            .aggregate("J1", &active_state(0))
            .await
            .expect("aggregate");
        assert_eq!(result.artifact_count, 1);

        // Only listed artifacts were deleted.
        assert!(storage.head("J1/debug.log").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_artifact_aborts_without_deletes() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(&storage, "J1/0.csv", "h\na\n\n").await;
        put_artifact(&storage, "J1/1.csv", "header-only\n\n").await;

        let aggregator = RunAggregator::new(storage.clone());
        let err = aggregator.aggregate("J1", &active_state(0)).await.unwrap_err();
        assert!(matches!(err, Error::MalformedArtifact { .. }));

        // Nothing was deleted; the pass is re-runnable.
        assert_eq!(storage.list("J1/").await.unwrap().len(), 2);
        assert!(storage.head("runs/1.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn artifacts_outside_namespace_untouched() {
        let storage = Arc::new(MemoryBackend::new());
        seed_catalog(&storage).await;
        put_artifact(&storage, "J1/0.csv", "h\na\n\n").await;
        put_artifact(&storage, "J2/0.csv", "h\nz\n\n").await;

        let aggregator = RunAggregator::new(storage.clone());
        aggregator
            .aggregate("J1", &active_state(0))
            .await
            .expect("aggregate");

        assert!(storage.head("J2/0.csv").await.unwrap().is_some());
    }
}
