use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
