//! Canonical durable keys for pipeline state.
//!
//! This module is the single source of truth for every key the pipeline
//! reads or writes. No hardcoded key strings should exist outside this
//! module.
//!
//! # Key Layout
//!
//! ```text
//! run_info.json          run state record {active_run, last_run}
//! run_list.txt           work list for the active array job
//! scene_list.gz          gzip catalog of ingested scenes (header + rows)
//! runs/{n}.csv           merged result of run n
//! {job_id}/*.csv         per-element artifacts of one array job
//! tarq/*.tar.gz          incoming tarballs awaiting processing
//! ```

/// Canonical key generator for pipeline storage.
pub struct IngestPaths;

impl IngestPaths {
    /// Run state record: `{"active_run": string|null, "last_run": integer}`.
    pub const RUN_INFO: &'static str = "run_info.json";

    /// Newline-joined work list written before each array job submission.
    pub const RUN_LIST: &'static str = "run_list.txt";

    /// Gzip-compressed, newline-delimited catalog of ingested scenes.
    pub const SCENE_CATALOG: &'static str = "scene_list.gz";

    /// Default prefix under which incoming tarballs are discovered.
    pub const WORK_PREFIX: &'static str = "tarq/";

    /// Suffix identifying tarballs in the work prefix.
    pub const WORK_SUFFIX: &'static str = ".tar.gz";

    /// Suffix identifying per-element artifacts under a job namespace.
    pub const ARTIFACT_SUFFIX: &'static str = ".csv";

    /// Returns the key of the merged result for the given run number.
    #[must_use]
    pub fn run_result(run_number: u64) -> String {
        format!("runs/{run_number}.csv")
    }

    /// Returns the namespace prefix for per-element artifacts of a job.
    #[must_use]
    pub fn artifact_prefix(job_id: &str) -> String {
        format!("{job_id}/")
    }

    /// Returns true if the key names a per-element artifact.
    #[must_use]
    pub fn is_artifact(key: &str) -> bool {
        key.ends_with(Self::ARTIFACT_SUFFIX)
    }
}
