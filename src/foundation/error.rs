/// Convenience result type used across stagehand.
pub type StagehandResult<T> = Result<T, StagehandError>;

/// Top-level error taxonomy used by orchestration APIs.
///
/// Every variant is recoverable at the call boundary: a failed call leaves the orchestrator in a
/// valid state (possibly without an active backend).
#[derive(thiserror::Error, Debug)]
pub enum StagehandError {
    /// Invalid or unsupported configuration: unknown backend id, unsupported plugin, output
    /// buffers unsupported by the active backend.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller broke an API precondition (invalid root, root outside the configured subtree,
    /// no active backend).
    #[error("precondition violation: {0}")]
    Precondition(String),

    /// A backend plugin failed to produce an instance.
    #[error("resource acquisition failure: {0}")]
    ResourceAcquisition(String),

    /// Errors reported by a backend while syncing or executing.
    #[error("backend error: {0}")]
    Backend(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagehandError {
    /// Build a [`StagehandError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`StagehandError::Precondition`] value.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Build a [`StagehandError::ResourceAcquisition`] value.
    pub fn resource_acquisition(msg: impl Into<String>) -> Self {
        Self::ResourceAcquisition(msg.into())
    }

    /// Build a [`StagehandError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`StagehandError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
