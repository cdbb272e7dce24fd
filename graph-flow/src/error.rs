use thiserror::Error;

/// Errors raised while building or executing a graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Context error: {0}")]
    ContextError(String),

    /// Typed task failures travel through here so callers can downcast them.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
