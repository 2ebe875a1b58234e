use thiserror::Error;

/// Errors surfaced by the chat core.
///
/// `Display` output is what the chat view shows to the user.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Please set up your Hugging Face API token in settings")]
    MissingCredential,

    #[error("Invalid API token. Please check your token in settings.")]
    InvalidCredential,

    #[error("Model is currently loading. Please try again in a few seconds.")]
    ModelLoading,

    #[error("API Error: {status} {reason}")]
    Api { status: u16, reason: String },

    #[error("Unexpected API response format")]
    ResponseFormat,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Extraction(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request was interrupted: {0}")]
    Interrupted(String),
}

impl ChatError {
    /// Map a failed endpoint status onto the error taxonomy.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 => ChatError::InvalidCredential,
            404 => ChatError::ModelLoading,
            code => ChatError::Api {
                status: code,
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            },
        }
    }

    /// HTTP status carried by the error, if it came from an endpoint response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::InvalidCredential => Some(401),
            ChatError::ModelLoading => Some(404),
            ChatError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
