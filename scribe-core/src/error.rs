// Error taxonomy shared by every context
// Failures are turned into a one-line status message at the edge of a user action

use thiserror::Error;

use crate::registry::Capability;
use crate::types::ActionId;

/// Rejections that happen before any backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text to process.")]
    EmptyInput,

    #[error("Please enter at least {min} characters (got {len}).")]
    InputTooShort { len: usize, min: usize },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown tone: {0}")]
    UnknownTone(String),

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Not an image data URL")]
    InvalidDataUrl,
}

/// Persistence read/write failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The processing backend was invoked but did not produce a result
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    Rejected(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("backend returned an empty result")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{capability} capability is not available for '{action}'")]
    CapabilityUnavailable {
        action: ActionId,
        capability: Capability,
    },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("cannot access {resource}: {reason}")]
    ResourceAccess {
        resource: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type AssistResult<T> = Result<T, AssistError>;

impl AssistError {
    pub fn resource(resource: &'static str, reason: impl Into<String>) -> Self {
        AssistError::ResourceAccess {
            resource,
            reason: reason.into(),
        }
    }

    /// Short message suitable for a status line
    pub fn status_message(&self) -> String {
        match self {
            AssistError::Validation(e) => e.to_string(),
            AssistError::CapabilityUnavailable { action, capability } => format!(
                "The {} capability needed for '{}' is not available on this device.",
                capability, action
            ),
            AssistError::Backend(e) => format!(
                "Error: {}\n\nThis might be because:\n• AI features are not enabled\n• The backend version is too old\n• The model is not available in your region",
                e
            ),
            AssistError::ResourceAccess { resource, .. } => {
                format!("Could not access the {}.", resource)
            }
            AssistError::Storage(e) => {
                format!("Could not save or load data ({}).", e)
            }
        }
    }
}
