//! Job submission: persist the work list, submit the array job.
//!
//! An empty work list short-circuits before any durable write. Otherwise
//! the work list is persisted at [`IngestPaths::RUN_LIST`] first so the
//! array elements can index into it, then the job is submitted sized to the
//! list. If the durable write lands but submission fails, the work list no
//! longer corresponds to any job; that surfaces as
//! [`Error::OrphanedWorkList`] rather than a blindly retryable failure.

use std::sync::Arc;

use bytes::Bytes;

use tarq_core::{IngestPaths, StorageBackend, WritePrecondition};

use crate::batch::BatchClient;
use crate::error::{Error, Result};

/// Batch service coordinates for submissions.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Job name presented to the batch service.
    pub job_name: String,
    /// Target batch queue.
    pub job_queue: String,
    /// Job definition identifier.
    pub job_definition: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: "process-scenes".to_string(),
            job_queue: "scene-ingest".to_string(),
            job_definition: "scene-ingest:1".to_string(),
        }
    }
}

/// Outcome of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The work list was empty; nothing was written or submitted.
    NoWork,
    /// An array job is in flight.
    Submitted {
        /// Job identifier assigned by the batch service.
        job_id: String,
        /// Number of array elements.
        size: usize,
    },
}

/// Persists work lists and submits array jobs.
pub struct JobSubmitter {
    storage: Arc<dyn StorageBackend>,
    batch: Arc<dyn BatchClient>,
    config: JobConfig,
}

impl JobSubmitter {
    /// Creates a submitter over the given collaborators.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        batch: Arc<dyn BatchClient>,
        config: JobConfig,
    ) -> Self {
        Self {
            storage,
            batch,
            config,
        }
    }

    /// Submits the given work items as one array job.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the work list cannot be persisted
    /// (nothing was submitted), or [`Error::OrphanedWorkList`] if the list
    /// was persisted but submission failed.
    pub async fn submit(&self, work_items: &[String]) -> Result<Submission> {
        if work_items.is_empty() {
            tracing::info!("no work to be done");
            return Ok(Submission::NoWork);
        }

        self.storage
            .put(
                IngestPaths::RUN_LIST,
                Bytes::from(work_items.join("\n")),
                WritePrecondition::None,
            )
            .await?;

        let size = work_items.len();
        let job_id = self
            .batch
            .submit_array_job(
                &self.config.job_name,
                &self.config.job_queue,
                &self.config.job_definition,
                size,
            )
            .await
            .map_err(|e| Error::OrphanedWorkList {
                key: IngestPaths::RUN_LIST.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(job_id = %job_id, size, "submitted array job");
        Ok(Submission::Submitted { job_id, size })
    }
}
