use shared::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to read console input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode route: {0}")]
    Json(#[from] serde_json::Error),
}
