//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`CropCloudError`] via `From`.

/// Top-level error returned by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum CropCloudError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The key-value or analytical store failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A remote service (registry, time-series database, broker) failed.
    #[error("remote service error")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations detected while building or parsing domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("device key is missing")]
    MissingDeviceKey,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown schedule command `{0}`")]
    UnknownCommand(String),

    #[error("repeat interval of {0} hours is out of range")]
    RepeatOutOfRange(u32),

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("invalid date `{0}`")]
    InvalidDate(String),

    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),

    #[error("invalid recipe event action `{0}`")]
    UnknownRecipeAction(String),

    #[error("malformed image file name `{0}`")]
    InvalidFileName(String),

    #[error("malformed values payload: {0}")]
    InvalidValues(String),

    #[error("invalid recipe: {0}")]
    InvalidRecipe(&'static str),
}

/// A looked-up record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
