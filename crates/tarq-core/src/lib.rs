//! # tarq-core
//!
//! Core abstractions for the tarq scene ingestion pipeline.
//!
//! This crate provides the foundational types and traits used across all
//! tarq components:
//!
//! - **Scene Identifiers**: Parsed, validated scene tokens with spatial keys
//! - **Storage Backend**: Abstract object storage with conditional writes
//! - **Durable Keys**: Canonical key layout for pipeline state
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `tarq-core` is the only crate allowed to define shared primitives.
//! The orchestration domain in `tarq-flow` builds on the interfaces here
//! and never reaches around them.
//!
//! ## Example
//!
//! ```rust
//! use tarq_core::prelude::*;
//!
//! let scene: SceneId = "LC80830632019150LGN00".parse().unwrap();
//! assert_eq!(scene.path(), 83);
//! assert_eq!(scene.row(), 63);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod paths;
pub mod scene;
pub mod storage;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use tarq_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::paths::IngestPaths;
    pub use crate::scene::{SceneId, PATH_DOMAIN, ROW_DOMAIN};
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult,
    };
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use observability::{init_logging, LogFormat};
pub use paths::IngestPaths;
pub use scene::{SceneId, PATH_DOMAIN, ROW_DOMAIN};
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult};
