//! Error types for Chime.

use std::fmt;

use thiserror::Error;

use crate::ids::{AssetId, Category};

/// Errors surfaced by audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A Get-style lookup hit an asset that was never prepared.
    #[error("No {category} handle prepared for '{asset}'")]
    NotFound {
        /// Category cache that was searched.
        category: Category,
        /// Asset that was requested.
        asset: AssetId,
    },

    /// The host could not materialize the asset.
    #[error("Asset '{asset}' unavailable: {message}")]
    AssetUnavailable {
        /// Asset that failed to load.
        asset: AssetId,
        /// Host-supplied reason.
        message: String,
    },

    /// Failed to initialize the audio output device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Builds an `AssetUnavailable` error from any displayable cause.
    pub fn unavailable(asset: &AssetId, cause: impl fmt::Display) -> Self {
        Self::AssetUnavailable {
            asset: asset.clone(),
            message: cause.to_string(),
        }
    }
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Non-fatal notices about transitions that had nothing to do.
///
/// These are logged, never returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionWarning {
    /// Pause requested on a handle that is already paused.
    #[error("'{0}' is already paused")]
    AlreadyPaused(AssetId),

    /// Resume requested on a handle that is not paused.
    #[error("'{0}' is not paused, nothing to resume")]
    NotPaused(AssetId),
}
