//! Error types for the orchestration domain.
//!
//! The taxonomy follows the recovery policy, not the call site: transient
//! external failures are safe to retry on the next tick with no state
//! mutated; domain-data failures indicate upstream inconsistency and must
//! not silently advance run state; an orphaned work list needs cleanup
//! before a retry can be trusted.

/// The result type used throughout tarq-flow.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in orchestration operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from tarq-core (storage, scene parsing, serialization).
    #[error("core error: {0}")]
    Core(#[from] tarq_core::Error),

    /// A batch-execution service call failed.
    #[error("batch error: {message}")]
    Batch {
        /// Description of the batch failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A message queue call failed.
    #[error("queue error: {message}")]
    Queue {
        /// Description of the queue failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A run state save lost a conditional-write race.
    ///
    /// Another writer updated the run state record after this tick loaded
    /// it. Nothing was mutated; the next tick reloads and retries.
    #[error("stale run state: current version is {current_version}")]
    StaleRunState {
        /// The version token currently stored.
        current_version: String,
    },

    /// A work list was persisted but job submission failed.
    ///
    /// The durable work list no longer corresponds to any job. A blind
    /// retry must not reuse it for a different job id, so this is surfaced
    /// distinctly from transient failures.
    #[error("orphaned work list at '{key}': {message}")]
    OrphanedWorkList {
        /// The durable key holding the orphaned work list.
        key: String,
        /// Description of the submission failure.
        message: String,
    },

    /// A complete job produced no output artifacts.
    #[error("no artifacts found for job {job_id}")]
    NoArtifacts {
        /// The job whose namespace was empty.
        job_id: String,
    },

    /// A per-element artifact could not be decoded.
    #[error("malformed artifact '{key}': {message}")]
    MalformedArtifact {
        /// The artifact key.
        key: String,
        /// Description of the problem.
        message: String,
    },
}

impl Error {
    /// Creates a new batch error.
    #[must_use]
    pub fn batch(message: impl Into<String>) -> Self {
        Self::Batch {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new batch error with a source cause.
    #[must_use]
    pub fn batch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Batch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new queue error.
    #[must_use]
    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if retrying on the next tick, with no cleanup, is safe.
    ///
    /// Domain-data errors and orphaned work lists are deliberately not
    /// transient: both need attention before progress resumes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Batch { .. } | Self::Queue { .. } | Self::StaleRunState { .. } => true,
            Self::Core(core) => matches!(core, tarq_core::Error::Storage { .. }),
            Self::OrphanedWorkList { .. }
            | Self::NoArtifacts { .. }
            | Self::MalformedArtifact { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_errors_are_transient() {
        assert!(Error::batch("throttled").is_transient());
        assert!(Error::queue("unavailable").is_transient());
        assert!(Error::StaleRunState {
            current_version: "3".into()
        }
        .is_transient());
    }

    #[test]
    fn domain_errors_are_not_transient() {
        assert!(!Error::NoArtifacts { job_id: "J1".into() }.is_transient());
        assert!(!Error::OrphanedWorkList {
            key: "run_list.txt".into(),
            message: "submit failed".into()
        }
        .is_transient());
        let invalid = Error::Core(tarq_core::Error::InvalidSceneId {
            message: "path 999".into(),
        });
        assert!(!invalid.is_transient());
    }

    #[test]
    fn core_storage_errors_are_transient() {
        let err = Error::Core(tarq_core::Error::storage("timeout"));
        assert!(err.is_transient());
    }

    #[test]
    fn orphaned_work_list_display_names_key() {
        let err = Error::OrphanedWorkList {
            key: "run_list.txt".into(),
            message: "submit rejected".into(),
        };
        assert!(err.to_string().contains("run_list.txt"));
    }
}
