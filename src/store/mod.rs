//! In-process document store.
//!
//! A single actor owns every document and serves `get` / `set` / `delete` /
//! `list` / `subscribe` requests over a channel, the same way the services
//! in this crate talk to each other. Each document carries a version that
//! writers can pin with [`SetOptions::expected_version`].

mod actor;
pub mod path;
pub mod schema;

pub use actor::{StoreActor, StoreClient, StoreRequest, StoreResponse};

use serde_json::Value;
use thiserror::Error;

/// A stored document together with its position and version.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub path: String,
    /// Increases on every write to the path, including across a delete and
    /// re-create, so a version is never reused.
    pub version: u64,
    pub data: Value,
}

/// Write options for [`StoreClient::set_document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge top-level fields into the existing document instead of replacing it.
    pub merge: bool,
    /// Only write if the document is currently at this version (0 = absent).
    pub expected_version: Option<u64>,
}

impl SetOptions {
    pub fn overwrite() -> Self {
        Self::default()
    }

    pub fn merge() -> Self {
        Self {
            merge: true,
            expected_version: None,
        }
    }

    pub fn create_only() -> Self {
        Self::if_version(0)
    }

    pub fn if_version(version: u64) -> Self {
        Self {
            merge: false,
            expected_version: Some(version),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Version conflict on {path}: expected {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Document at {0} must be a JSON object")]
    NotAnObject(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
