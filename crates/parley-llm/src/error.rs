use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("API key for engine {0} not found")]
    MissingCredentials(String),

    #[error("Provider error: {0}")]
    Provider(#[from] anyhow::Error),
}
