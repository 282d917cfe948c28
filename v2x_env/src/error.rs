//! Error types for the dataset provider boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the dataset catalog or sensor payloads.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Requested scene index is past the end of the catalog
    #[error("Scene {scene_id} out of range (catalog has {scene_count} scenes)")]
    SceneOutOfRange { scene_id: usize, scene_count: usize },

    /// A sample or sample_data token does not resolve
    #[error("Unknown {table} token: {token}")]
    UnknownToken { table: &'static str, token: String },

    /// A frame's `next` link leads back to a frame already visited
    #[error("Frame chain revisits sample {token}")]
    CyclicChain { token: String },

    /// Filesystem read failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog table could not be parsed
    #[error("Malformed catalog table {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Payload file is not a readable numeric .npy array
    #[error("NPY read error at {}: {message}", path.display())]
    Npy { path: PathBuf, message: String },

    /// In-memory dataset has no payload under this filename
    #[error("No payload stored for {0}")]
    MissingPayload(String),
}

impl ProviderError {
    /// Creates an unknown-token error.
    pub fn unknown(table: &'static str, token: impl std::fmt::Display) -> Self {
        Self::UnknownToken {
            table,
            token: token.to_string(),
        }
    }

    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
