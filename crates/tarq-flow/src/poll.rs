//! Job status polling and completion classification.
//!
//! The batch service answers only per-category listing queries, so the
//! poller asks for each of the seven categories in turn and fully drains
//! pagination before counting. Partial pagination must never be read as a
//! final count.
//!
//! A job is complete when every counted element is terminal and at least
//! one element was counted: right after submission the service may list
//! nothing at all, and that eventual-consistency gap is "not yet
//! complete", never "vacuously complete".

use std::collections::HashMap;
use std::sync::Arc;

use crate::batch::{BatchClient, JobPage, JobStatus};
use crate::error::Result;

/// A lazy, restartable sequence of listing pages for one status category.
pub struct StatusPages<'a> {
    batch: &'a dyn BatchClient,
    job_id: &'a str,
    status: JobStatus,
    token: Option<String>,
    done: bool,
}

impl<'a> StatusPages<'a> {
    /// Starts a page sequence for `job_id` in `status`.
    #[must_use]
    pub fn new(batch: &'a dyn BatchClient, job_id: &'a str, status: JobStatus) -> Self {
        Self {
            batch,
            job_id,
            status,
            token: None,
            done: false,
        }
    }

    /// Fetches the next page, or `None` once the category is drained.
    ///
    /// # Errors
    ///
    /// Propagates batch service failures; the sequence can be restarted
    /// afterwards.
    pub async fn next_page(&mut self) -> Result<Option<JobPage>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .batch
            .list_jobs(self.job_id, self.status, self.token.as_deref())
            .await?;

        self.token = page.next_token.clone();
        self.done = self.token.is_none();
        Ok(Some(page))
    }

    /// Resets the sequence to the first page.
    pub fn restart(&mut self) {
        self.token = None;
        self.done = false;
    }
}

/// Per-category element counts for one job.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    counts: HashMap<JobStatus, usize>,
}

impl StatusSnapshot {
    /// Builds a snapshot from explicit counts (test fixtures).
    #[must_use]
    pub fn from_counts(counts: &[(JobStatus, usize)]) -> Self {
        Self {
            counts: counts.iter().copied().collect(),
        }
    }

    /// Returns the count for one category.
    #[must_use]
    pub fn count(&self, status: JobStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Returns the total across all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Returns the count of terminal elements.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(JobStatus::Succeeded) + self.count(JobStatus::Failed)
    }

    /// Classifies the job as pending or complete.
    #[must_use]
    pub fn classify(&self) -> JobProgress {
        let total = self.total();
        if total > 0 && self.completed() == total {
            JobProgress::Complete {
                failed: self.count(JobStatus::Failed),
            }
        } else {
            JobProgress::Pending
        }
    }
}

/// Completion classification of one array job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobProgress {
    /// Elements are still draining through the queue.
    Pending,
    /// Every element is terminal.
    Complete {
        /// Number of failed elements; non-zero means degraded completion.
        failed: usize,
    },
}

/// Polls the batch service for a job's status distribution.
pub struct JobStatusPoller {
    batch: Arc<dyn BatchClient>,
}

impl JobStatusPoller {
    /// Creates a poller over the given batch client.
    #[must_use]
    pub fn new(batch: Arc<dyn BatchClient>) -> Self {
        Self { batch }
    }

    /// Counts elements in every category, pagination fully drained.
    ///
    /// # Errors
    ///
    /// Propagates batch service failures; the caller retries on the next
    /// tick.
    pub async fn poll(&self, job_id: &str) -> Result<StatusSnapshot> {
        let mut counts = HashMap::new();

        for status in JobStatus::ALL {
            let mut pages = StatusPages::new(self.batch.as_ref(), job_id, status);
            let mut count = 0;
            while let Some(page) = pages.next_page().await? {
                count += page.element_ids.len();
            }
            counts.insert(status, count);
        }

        Ok(StatusSnapshot { counts })
    }
}
