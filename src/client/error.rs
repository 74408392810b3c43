use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Missing POST API key")]
    MissingApiKey,

    #[error("Missing POST API provider")]
    MissingProvider,

    #[error("Missing POST API schema URL")]
    MissingSchemaUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The API answered with something other than 200
    #[error("{status} {body}.")]
    Rejected { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    InvalidResponse(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
