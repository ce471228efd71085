use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("remote error {name}: {message}")]
    Remote { name: String, message: String },

    #[error("token rejected by the service")]
    Unauthorized,

    #[error("malformed response: {0}")]
    Malformed(String),
}
