use thiserror::Error;

/// Failure raised by a connector when its underlying action cannot complete.
/// This is the only error channel connectors have.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConnectorExecutionError {
    pub message: String,
}

impl ConnectorExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error taxonomy shared by the engine, registry, and storage layers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("unknown step type '{0}'")]
    UnknownStepType(String),

    #[error("invalid config for step '{step_id}': {message}")]
    InvalidStepConfig { step_id: String, message: String },

    #[error("invalid config schema for connector '{step_type}': {message}")]
    InvalidConnectorSchema { step_type: String, message: String },

    #[error(transparent)]
    Connector(#[from] ConnectorExecutionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn workflow_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "workflow",
            id: id.to_string(),
        }
    }

    pub fn run_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "run",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
