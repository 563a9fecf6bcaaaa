//! WebSocket error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WsError {
    #[error("Socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket protocol error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed client message or unencodable server message
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
