//! Durable run state: the single source of truth for "is work executing".
//!
//! The record lives at [`IngestPaths::RUN_INFO`] as JSON
//! `{"active_run": string|null, "last_run": integer}`. It is seeded once at
//! bootstrap and mutated only by the orchestration loop.
//!
//! Saves are conditional writes keyed by the version token observed at
//! load. The loop is designed for serial invocation, but if ticks ever
//! overlap the loser surfaces [`Error::StaleRunState`] and mutates nothing
//! instead of silently clobbering the winner's record.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use tarq_core::{Error as CoreError, IngestPaths, StorageBackend, WritePrecondition, WriteResult};

use crate::error::{Error, Result};

/// The durable run state record.
///
/// Invariant: `active_run` is non-null iff an array job has been submitted
/// and not yet fully aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Job identifier of the in-flight run, if any.
    pub active_run: Option<String>,
    /// Monotonically increasing count of completed runs.
    pub last_run: u64,
}

impl RunState {
    /// Returns true if a run is in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active_run.is_some()
    }
}

/// A loaded run state together with its storage version token.
#[derive(Debug, Clone)]
pub struct PersistedRunState {
    /// The decoded record.
    pub state: RunState,
    /// Version token to present on the next save.
    pub version: String,
}

/// Load/save access to the durable run state record.
pub struct RunStateStore {
    storage: Arc<dyn StorageBackend>,
}

impl RunStateStore {
    /// Creates a store over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Loads the record and its version token.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record is missing (it is seeded at
    /// bootstrap) or a serialization error if it does not decode.
    pub async fn load(&self) -> Result<PersistedRunState> {
        // head before get: if a write lands between the two calls we pair
        // fresh bytes with a stale token and the next save fails CAS, which
        // is the safe direction.
        let meta = self
            .storage
            .head(IngestPaths::RUN_INFO)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("run state record {} missing", IngestPaths::RUN_INFO))
            })?;
        let bytes = self.storage.get(IngestPaths::RUN_INFO).await?;

        let state: RunState = serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::serialization(format!("run state record does not decode: {e}"))
        })?;

        Ok(PersistedRunState {
            state,
            version: meta.version,
        })
    }

    /// Conditionally overwrites the record.
    ///
    /// Returns the new version token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleRunState`] if the stored version no longer
    /// matches `version`; nothing is written in that case.
    pub async fn save(&self, state: &RunState, version: &str) -> Result<String> {
        let payload = serde_json::to_vec(state).map_err(|e| {
            CoreError::serialization(format!("run state record does not encode: {e}"))
        })?;

        let result = self
            .storage
            .put(
                IngestPaths::RUN_INFO,
                Bytes::from(payload),
                WritePrecondition::MatchesVersion(version.to_string()),
            )
            .await?;

        match result {
            WriteResult::Success { version } => Ok(version),
            WriteResult::PreconditionFailed { current_version } => {
                Err(Error::StaleRunState { current_version })
            }
        }
    }

    /// Seeds the record at bootstrap.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record already exists.
    pub async fn seed(&self, state: &RunState) -> Result<String> {
        let payload = serde_json::to_vec(state).map_err(|e| {
            CoreError::serialization(format!("run state record does not encode: {e}"))
        })?;

        let result = self
            .storage
            .put(
                IngestPaths::RUN_INFO,
                Bytes::from(payload),
                WritePrecondition::DoesNotExist,
            )
            .await?;

        match result {
            WriteResult::Success { version } => Ok(version),
            WriteResult::PreconditionFailed { current_version } => {
                Err(Error::StaleRunState { current_version })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarq_core::MemoryBackend;

    fn store() -> RunStateStore {
        RunStateStore::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn seed_load_roundtrip() {
        let store = store();
        store
            .seed(&RunState {
                active_run: None,
                last_run: 7,
            })
            .await
            .expect("seed");

        let persisted = store.load().await.expect("load");
        assert_eq!(persisted.state.active_run, None);
        assert_eq!(persisted.state.last_run, 7);
        assert!(!persisted.state.is_active());
    }

    #[tokio::test]
    async fn save_with_current_version_succeeds() {
        let store = store();
        store
            .seed(&RunState {
                active_run: None,
                last_run: 0,
            })
            .await
            .expect("seed");

        let persisted = store.load().await.expect("load");
        let new_state = RunState {
            active_run: Some("J1".to_string()),
            last_run: 0,
        };
        store
            .save(&new_state, &persisted.version)
            .await
            .expect("save");

        let reloaded = store.load().await.expect("load");
        assert_eq!(reloaded.state, new_state);
    }

    #[tokio::test]
    async fn save_with_stale_version_is_rejected() {
        let store = store();
        store
            .seed(&RunState {
                active_run: None,
                last_run: 0,
            })
            .await
            .expect("seed");

        let first = store.load().await.expect("load");

        // A concurrent tick wins the race.
        store
            .save(
                &RunState {
                    active_run: Some("J1".to_string()),
                    last_run: 0,
                },
                &first.version,
            )
            .await
            .expect("save");

        // The loser's save must not clobber.
        let err = store
            .save(
                &RunState {
                    active_run: Some("J2".to_string()),
                    last_run: 0,
                },
                &first.version,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StaleRunState { .. }));

        let reloaded = store.load().await.expect("load");
        assert_eq!(reloaded.state.active_run.as_deref(), Some("J1"));
    }

    #[tokio::test]
    async fn load_without_seed_is_an_error() {
        let err = store().load().await.unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::NotFound(_))));
    }

    #[test]
    fn record_wire_format() {
        let state = RunState {
            active_run: Some("J1".to_string()),
            last_run: 7,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"active_run":"J1","last_run":7}"#);

        let idle: RunState = serde_json::from_str(r#"{"active_run":null,"last_run":0}"#).unwrap();
        assert_eq!(idle.active_run, None);
    }
}
