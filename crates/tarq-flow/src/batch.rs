//! Batch-execution service interface.
//!
//! The pipeline drives an array-style batch executor: one submission fans
//! out into N independently scheduled elements, each processing one work
//! item. The service exposes no combined status query, only per-category
//! listing with pagination, so callers enumerate the seven categories and
//! drain each one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

use tarq_core::Error as CoreError;

use crate::error::{Error, Result};

/// The closed set of per-element status categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Accepted by the service, not yet evaluated.
    Submitted,
    /// Waiting on dependencies.
    Pending,
    /// Eligible to be scheduled.
    Runnable,
    /// Resources allocated, container starting.
    Starting,
    /// Executing.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed,
}

impl JobStatus {
    /// All categories, in service enumeration order.
    pub const ALL: [Self; 7] = [
        Self::Submitted,
        Self::Pending,
        Self::Runnable,
        Self::Starting,
        Self::Running,
        Self::Succeeded,
        Self::Failed,
    ];

    /// Returns true if elements in this category are finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns the service wire name for this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Pending => "PENDING",
            Self::Runnable => "RUNNABLE",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One page of a per-category element listing.
#[derive(Debug, Clone)]
pub struct JobPage {
    /// Element identifiers on this page.
    pub element_ids: Vec<String>,
    /// Token for the next page, if any.
    pub next_token: Option<String>,
}

/// Client for the array-style batch-execution service.
#[async_trait]
pub trait BatchClient: Send + Sync {
    /// Submits an array job of the given size.
    ///
    /// Returns the opaque job identifier assigned by the service.
    async fn submit_array_job(
        &self,
        name: &str,
        queue: &str,
        definition: &str,
        size: usize,
    ) -> Result<String>;

    /// Lists elements of a job in one status category, one page at a time.
    ///
    /// Pass the `next_token` of the previous page to continue; `None`
    /// starts from the beginning.
    async fn list_jobs(
        &self,
        job_id: &str,
        status: JobStatus,
        page_token: Option<&str>,
    ) -> Result<JobPage>;
}

/// Scriptable in-memory batch client for testing.
///
/// Freshly submitted jobs hold every element in `Submitted`; tests move
/// elements between categories with [`set_statuses`](Self::set_statuses).
/// Unknown job ids list as empty, mimicking the service's eventual
/// consistency right after submission.
#[derive(Debug)]
pub struct InMemoryBatchClient {
    inner: Mutex<Inner>,
    page_size: usize,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<String, Vec<JobStatus>>,
    submissions: u64,
    fail_submissions: bool,
}

impl Default for InMemoryBatchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBatchClient {
    /// Creates a client with a large page size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: 100,
        }
    }

    /// Creates a client that paginates with the given page size.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size,
        }
    }

    /// Makes subsequent submissions fail (or succeed again).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn fail_submissions(&self, fail: bool) {
        self.inner.lock().expect("lock poisoned").fail_submissions = fail;
    }

    /// Replaces a job's element distribution.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn set_statuses(&self, job_id: &str, distribution: &[(JobStatus, usize)]) {
        let mut elements = Vec::new();
        for (status, count) in distribution {
            elements.extend(std::iter::repeat(*status).take(*count));
        }
        self.inner
            .lock()
            .expect("lock poisoned")
            .jobs
            .insert(job_id.to_string(), elements);
    }

    /// Returns a job's declared size, if known.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn job_size(&self, job_id: &str) -> Option<usize> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .jobs
            .get(job_id)
            .map(Vec::len)
    }
}

#[async_trait]
impl BatchClient for InMemoryBatchClient {
    async fn submit_array_job(
        &self,
        _name: &str,
        _queue: &str,
        _definition: &str,
        size: usize,
    ) -> Result<String> {
        let mut inner = self.inner.lock().map_err(|_| CoreError::Internal {
            message: "lock poisoned".into(),
        })?;

        if inner.fail_submissions {
            return Err(Error::batch("submission rejected"));
        }

        inner.submissions += 1;
        let job_id = format!("job-{}", inner.submissions);
        inner
            .jobs
            .insert(job_id.clone(), vec![JobStatus::Submitted; size]);
        Ok(job_id)
    }

    async fn list_jobs(
        &self,
        job_id: &str,
        status: JobStatus,
        page_token: Option<&str>,
    ) -> Result<JobPage> {
        let inner = self.inner.lock().map_err(|_| CoreError::Internal {
            message: "lock poisoned".into(),
        })?;

        let matching: Vec<String> = inner
            .jobs
            .get(job_id)
            .map(|elements| {
                elements
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| **s == status)
                    .map(|(i, _)| format!("{job_id}:{i}"))
                    .collect()
            })
            .unwrap_or_default();

        let start: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| Error::batch(format!("bad page token '{token}'")))?,
            None => 0,
        };

        let end = (start + self.page_size).min(matching.len());
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(JobPage {
            element_ids: matching[start.min(matching.len())..end].to_vec(),
            next_token,
        })
    }
}
