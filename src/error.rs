use std::io;
use thiserror::Error;

/// Faults on the framed channel. `Closed` is the clean end-of-stream case and
/// is the only variant a session treats as a normal close.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection closed by peer")]
    Closed,
    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("Failed to decode frame: {0}")]
    Decode(serde_json::Error),
    #[error("Failed to encode frame: {0}")]
    Encode(serde_json::Error),
}

impl TransportError {
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("Failed to accept connection: {0}")]
    Accept(io::Error),
    #[error("Listener I/O error: {0}")]
    Io(#[from] io::Error),
}
