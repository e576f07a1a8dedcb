//! # tarq-flow
//!
//! Run orchestration and deduplication engine for the tarq scene ingestion
//! pipeline.
//!
//! The pipeline coordinates periodic large-scale ingestion of satellite
//! scene archives: it detects newly available tarballs, submits them as one
//! array job to a batch executor, waits for that job to finish, merges the
//! per-element outputs into the authoritative catalog, and remembers which
//! scenes were ingested so duplicates are never reprocessed.
//!
//! ## Core Concepts
//!
//! - **Run**: one full cycle from job submission to aggregated,
//!   catalog-merged completion. At most one run is in flight at any time.
//! - **Catalog**: the durable, ever-growing list of ingested scenes,
//!   indexed per discovery cycle for bulk deduplication.
//! - **Artifact**: the per-element output of one array job element,
//!   namespaced under that job's identifier until aggregation consumes it.
//!
//! ## Guarantees
//!
//! - **Single active run**: the durable run state record is the sole source
//!   of truth, and saves are conditional writes.
//! - **No partial progress on errors**: any tick that fails leaves the run
//!   state record untouched; the next tick retries from scratch.
//! - **Deterministic aggregation**: artifact keys are sorted before the
//!   merge, so the retained header does not depend on listing order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tarq_core::MemoryBackend;
//! use tarq_flow::batch::InMemoryBatchClient;
//! use tarq_flow::orchestrator::{Orchestrator, OrchestratorConfig, TracingAlertSink};
//!
//! # async fn example() -> tarq_flow::error::Result<()> {
//! let orchestrator = Orchestrator::new(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(InMemoryBatchClient::new()),
//!     Arc::new(TracingAlertSink),
//!     OrchestratorConfig::default(),
//! );
//!
//! let outcome = orchestrator.tick().await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod discovery;
pub mod error;
pub mod index;
pub mod orchestrator;
pub mod poll;
pub mod queue;
pub mod state;
pub mod submit;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregate::{AggregatedRun, RunAggregator};
    pub use crate::batch::{BatchClient, InMemoryBatchClient, JobPage, JobStatus};
    pub use crate::catalog::SceneCatalog;
    pub use crate::discovery::{discover, CandidateRecord, DiscoveryFilter};
    pub use crate::error::{Error, Result};
    pub use crate::index::{scene_index_for, FlatIndex, PathRowIndex, SceneIndex};
    pub use crate::orchestrator::{
        AlertSink, Orchestrator, OrchestratorConfig, TickOutcome, TracingAlertSink,
    };
    pub use crate::poll::{JobProgress, JobStatusPoller, StatusSnapshot};
    pub use crate::queue::{dispatch_scenes, InMemoryQueue, MessageQueue, QueueMessage};
    pub use crate::state::{PersistedRunState, RunState, RunStateStore};
    pub use crate::submit::{JobConfig, JobSubmitter, Submission};
}
