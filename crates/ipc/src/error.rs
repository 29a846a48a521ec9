//! Failures on the UI transport.

/// Errors while encoding core notifications or decoding UI messages.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Could not encode core notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Malformed UI message: {0}")]
    MalformedMessage(String),
}
