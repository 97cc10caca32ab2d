use thiserror::Error;

/// Generative-language API errors
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },
}

impl GeminiError {
    /// The message the upstream service attached to a failure, without the
    /// variant prefix. This is what callers fold into user-facing text.
    pub fn upstream_message(&self) -> String {
        match self {
            Self::HttpError { message, .. } => message.clone(),
            Self::ConfigError(message) | Self::RequestError(message) | Self::ParsingError(message) => {
                message.clone()
            }
        }
    }
}

/// Result type for generative-language operations
pub type GeminiResult<T> = Result<T, GeminiError>;
