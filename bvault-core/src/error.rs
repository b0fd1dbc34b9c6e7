use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A filesystem operation on a specific path; `op` names what was attempted.
    #[error("{op} {}: {source}", path.display())]
    Path {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url}: HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("catalog: {0}")]
    Catalog(String),

    #[error("no locations configured for {kind}")]
    NoLocations { kind: String },

    #[error("fetch {kind} for {guid}: {attempts} location(s) failed, last: {last}")]
    Exhausted {
        kind: String,
        guid: String,
        attempts: usize,
        last: Box<VaultError>,
    },

    #[error("invalid version tag {0:?}")]
    Version(String),

    #[error("config: {0}")]
    Config(String),
}

impl VaultError {
    pub(crate) fn path(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VaultError::Path {
            op,
            path: path.into(),
            source,
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, VaultError>;
