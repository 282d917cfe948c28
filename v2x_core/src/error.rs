//! Error types for index construction and agent selection.

use thiserror::Error;
use v2x_env::ProviderError;

/// Errors raised by the core.
///
/// Construction-time variants abort the whole index build; query-time
/// operations never fail on missing data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Dataset read failed during index construction
    #[error("Provider read failure: {0}")]
    ProviderRead(#[from] ProviderError),

    /// Index ranges or settings are malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unrecognized selection method or bad strategy options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A position channel has no companion inertial channel in its frame
    #[error("Scene {scene_id} frame {frame_id}: missing channel {channel}")]
    MissingChannel {
        scene_id: usize,
        frame_id: usize,
        channel: String,
    },

    /// A payload has fewer scalars than its channel family requires
    #[error("Malformed payload {filename}: expected at least {expected} values, found {found}")]
    MalformedPayload {
        filename: String,
        expected: usize,
        found: usize,
    },
}

impl CoreError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an invalid-argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
