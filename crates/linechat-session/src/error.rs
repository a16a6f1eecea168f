//! Session error taxonomy.

use std::time::Duration;

use linechat_core::ChannelKind;
use linechat_protocol::{CodecError, HandshakeError};

/// Session error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid token: the server does not know this account hash")]
    InvalidToken,
    #[error("Handshake failed: {0}")]
    Handshake(HandshakeError),
    #[error("Handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("Failed to connect {channel} channel to {host}:{port}: {source}")]
    Connect {
        channel: ChannelKind,
        host: String,
        port: u16,
        source: std::io::Error,
    },
    #[error("Stream error: {0}")]
    Stream(#[from] CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Terminal errors stop the supervisor instead of triggering a reconnect.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidToken)
    }
}

impl From<HandshakeError> for SessionError {
    fn from(err: HandshakeError) -> Self {
        match err {
            HandshakeError::InvalidToken => Self::InvalidToken,
            other => Self::Handshake(other),
        }
    }
}
