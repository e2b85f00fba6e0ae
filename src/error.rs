//! Error kinds for every stage of a harvest run.
//!
//! Errors are tagged by the scope that absorbs them:
//! - [`AuthError`] stops the run before any project is touched.
//! - [`FetchError`] is absorbed by the collector; the affected field degrades
//!   to an empty or null value.
//! - [`PersistenceError`] is absorbed per project and per sink.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single call against the issue tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request to tracker failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("could not decode tracker response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The tracker rejected the configured credentials (or could not be reached).
#[derive(Debug, Error)]
#[error("authentication against {base_url} failed: {source}")]
pub struct AuthError {
    pub base_url: String,
    #[source]
    pub source: TrackerError,
}

/// One collector sub-fetch failed.
#[derive(Debug, Error)]
#[error("failed to fetch {resource} for {target}: {source}")]
pub struct FetchError {
    pub resource: &'static str,
    pub target: String,
    #[source]
    pub source: TrackerError,
}

impl FetchError {
    pub fn new(resource: &'static str, target: impl Into<String>, source: TrackerError) -> Self {
        Self {
            resource,
            target: target.into(),
            source,
        }
    }
}

/// Failure of a single call against the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to object store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("storage account key is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),

    #[error("could not build a Shared Key signature")]
    SigningKey,
}

/// A sink could not persist a project.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{kind} object has no plain record representation")]
    NotPlainRecord { kind: String },

    #[error("could not serialize bundle: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload of {path} failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("could not set up tracker client: {0}")]
    TrackerSetup(#[source] TrackerError),

    #[error("could not set up object store: {0}")]
    StoreSetup(#[source] StoreError),
}
