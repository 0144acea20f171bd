use thiserror::Error;

/// Main error type for the scale-test harness.
#[derive(Error, Debug)]
pub enum ScaleTestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error("unresolved template parameter '{0}'")]
    UnresolvedParameter(String),

    #[error("cluster operation failed: {0}")]
    ExternalCollaborator(String),

    #[error("workload not ready within {0}s: {1}")]
    ReadinessTimeout(u64, String),

    #[error("workload not deleted within {0}s: {1}")]
    DeletionTimeout(u64, String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for the harness.
pub type Result<T> = std::result::Result<T, ScaleTestError>;
