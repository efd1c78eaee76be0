use thiserror::Error;

/// Unified application error type to simplify bubbling errors through async flows.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Errored while handling a file. {0}")]
    Command(#[from] std::io::Error),
    #[error("Error serializing json. {0}")]
    SerdeJsonSer(#[from] serde_json::Error),
    #[error("Error communicating with the AI. {0}")]
    AIClient(#[from] async_openai::error::OpenAIError),
    #[error("Embedding provider returned an unusable batch. {0}")]
    EmbeddingShape(String),
    #[error("Unable to label a feedback theme. {0}")]
    Labeling(String),
    #[error("Timed out waiting for the AI. {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
    #[error("Error parsing the duration string. {0}")]
    DurationParse(#[from] humantime::DurationError),
    #[error("{0}")]
    Other(String),
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
