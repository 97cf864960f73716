use thiserror::Error;

/// Errors raised while talking to Vertex AI or preparing a chat session
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Credential Error: {0}")]
    CredentialError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Authentication Error: {0}")]
    AuthError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Session halted: {0}")]
    SessionHalted(String),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
