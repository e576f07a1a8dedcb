//! The orchestration loop: one tick of the single-active-run state machine.
//!
//! An external scheduler invokes [`Orchestrator::tick`] serially. Each tick
//! loads the durable run state and either starts a new run (candidate
//! discovery over the work prefix, then job submission) or services the
//! active one (status poll, then aggregation once complete). Every tick
//! resolves to exactly one [`TickOutcome`], and run state mutations are
//! all-or-nothing: an error anywhere leaves the record untouched so the
//! next tick retries from a clean state.
//!
//! Collaborators are injected at construction; the loop holds no global
//! service handles and no internal retry loop. Retry policy belongs to the
//! invoking scheduler.

use std::sync::Arc;

use async_trait::async_trait;

use tarq_core::{IngestPaths, StorageBackend};

use crate::aggregate::RunAggregator;
use crate::batch::BatchClient;
use crate::catalog::SceneCatalog;
use crate::discovery::{discover, CandidateRecord, DiscoveryFilter};
use crate::error::Result;
use crate::index::scene_index_for;
use crate::poll::{JobProgress, JobStatusPoller};
use crate::state::{RunState, RunStateStore};
use crate::submit::{JobConfig, JobSubmitter, Submission};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Batch service coordinates for submissions.
    pub job: JobConfig,
    /// Storage prefix scanned for incoming work.
    pub work_prefix: String,
    /// Suffix identifying work items under the prefix.
    pub work_suffix: String,
    /// Discovery criteria applied before the catalog check.
    pub filter: DiscoveryFilter,
    /// Cap on work items per run, if any.
    pub max_work_items: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job: JobConfig::default(),
            work_prefix: IngestPaths::WORK_PREFIX.to_string(),
            work_suffix: IngestPaths::WORK_SUFFIX.to_string(),
            filter: DiscoveryFilter::default(),
            max_work_items: None,
        }
    }
}

/// The per-tick classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No active run and no candidate work; state unchanged.
    NoWork,
    /// A new run was started.
    StartedRun {
        /// Job identifier of the new run.
        job_id: String,
    },
    /// The active run has not finished; state unchanged.
    StillRunning {
        /// Job identifier of the active run.
        job_id: String,
    },
    /// The active run finished and its outputs were aggregated.
    CompletedRun {
        /// The run number assigned to the merged result.
        run_number: u64,
        /// Failed element count; non-zero means a degraded completion was
        /// alerted.
        failed: usize,
    },
}

/// External alerting collaborator.
///
/// Degraded completions (failed elements in an otherwise complete job) are
/// surfaced here: alert-worthy, never fatal to the pipeline.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Reports a run that completed with failed elements.
    async fn degraded_completion(&self, job_id: &str, failed: usize);
}

/// Alert sink that records degraded completions in the log stream.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn degraded_completion(&self, job_id: &str, failed: usize) {
        tracing::warn!(job_id = %job_id, failed, "run completed with failed elements");
    }
}

/// The top-level decision procedure, invoked once per tick.
pub struct Orchestrator {
    storage: Arc<dyn StorageBackend>,
    alerts: Arc<dyn AlertSink>,
    state_store: RunStateStore,
    catalog: SceneCatalog,
    submitter: JobSubmitter,
    poller: JobStatusPoller,
    aggregator: RunAggregator,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Wires an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        batch: Arc<dyn BatchClient>,
        alerts: Arc<dyn AlertSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            state_store: RunStateStore::new(Arc::clone(&storage)),
            catalog: SceneCatalog::new(Arc::clone(&storage)),
            submitter: JobSubmitter::new(
                Arc::clone(&storage),
                Arc::clone(&batch),
                config.job.clone(),
            ),
            poller: JobStatusPoller::new(batch),
            aggregator: RunAggregator::new(Arc::clone(&storage)),
            storage,
            alerts,
            config,
        }
    }

    /// Runs one tick of the state machine.
    ///
    /// # Errors
    ///
    /// Any collaborator failure bubbles up with run state untouched; the
    /// scheduler retries on the next tick. See [`crate::error::Error`] for
    /// the taxonomy.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickOutcome> {
        let persisted = self.state_store.load().await?;

        match persisted.state.active_run.clone() {
            None => self.start_run(persisted.state, &persisted.version).await,
            Some(job_id) => {
                self.service_run(&job_id, persisted.state, &persisted.version)
                    .await
            }
        }
    }

    async fn start_run(&self, state: RunState, version: &str) -> Result<TickOutcome> {
        let work = self.discover_work().await?;

        match self.submitter.submit(&work).await? {
            Submission::NoWork => {
                tracing::info!("no work to be done");
                Ok(TickOutcome::NoWork)
            }
            Submission::Submitted { job_id, size } => {
                let new_state = RunState {
                    active_run: Some(job_id.clone()),
                    last_run: state.last_run,
                };
                self.state_store.save(&new_state, version).await?;
                tracing::info!(job_id = %job_id, size, "started run");
                Ok(TickOutcome::StartedRun { job_id })
            }
        }
    }

    async fn service_run(
        &self,
        job_id: &str,
        state: RunState,
        version: &str,
    ) -> Result<TickOutcome> {
        let snapshot = self.poller.poll(job_id).await?;

        match snapshot.classify() {
            JobProgress::Pending => {
                tracing::info!(
                    job_id = %job_id,
                    completed = snapshot.completed(),
                    total = snapshot.total(),
                    "run is still active"
                );
                Ok(TickOutcome::StillRunning {
                    job_id: job_id.to_string(),
                })
            }
            JobProgress::Complete { failed } => {
                if failed > 0 {
                    self.alerts.degraded_completion(job_id, failed).await;
                }

                // Aggregation errors propagate with state unchanged; the
                // next tick re-polls and retries from scratch.
                let aggregated = self.aggregator.aggregate(job_id, &state).await?;

                let new_state = RunState {
                    active_run: None,
                    last_run: state.last_run + 1,
                };
                self.state_store.save(&new_state, version).await?;

                tracing::info!(
                    job_id = %job_id,
                    run_number = new_state.last_run,
                    result_key = %aggregated.result_key,
                    failed,
                    "run is complete"
                );
                Ok(TickOutcome::CompletedRun {
                    run_number: new_state.last_run,
                    failed,
                })
            }
        }
    }

    /// Lists the work prefix and filters candidates against the catalog.
    async fn discover_work(&self) -> Result<Vec<String>> {
        let catalog_ids = self.catalog.load().await?;
        let index = scene_index_for(catalog_ids)?;

        let mut metas = self.storage.list(&self.config.work_prefix).await?;
        // Listing order is backend-dependent; sort for a stable work list.
        metas.sort_by(|a, b| a.path.cmp(&b.path));

        let records: Vec<CandidateRecord> = metas
            .iter()
            .filter_map(|meta| CandidateRecord::from_storage_key(&meta.path, &self.config.work_suffix))
            .collect();

        let fresh = discover(records, &self.config.filter, index.as_ref())?;

        let mut references: Vec<String> = fresh.into_iter().map(|r| r.reference).collect();
        if let Some(max) = self.config.max_work_items {
            references.truncate(max);
        }
        Ok(references)
    }
}
