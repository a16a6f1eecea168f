//! Liveness and lifecycle events emitted by the channels.

use std::{fmt, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Which socket an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Read-only stream of incoming chat lines.
    Read,
    /// Authenticated stream for outgoing messages.
    Send,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Send => f.write_str("send"),
        }
    }
}

/// Health signal produced after each I/O attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessEvent {
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub channel: ChannelKind,
    pub healthy: bool,
    pub timeout: Duration,
}

impl LivenessEvent {
    /// The I/O attempt completed within the bound.
    #[must_use]
    pub fn healthy(channel: ChannelKind, timeout: Duration) -> Self {
        Self::new(channel, true, timeout)
    }

    /// The bound elapsed before the I/O attempt completed.
    #[must_use]
    pub fn unhealthy(channel: ChannelKind, timeout: Duration) -> Self {
        Self::new(channel, false, timeout)
    }

    fn new(channel: ChannelKind, healthy: bool, timeout: Duration) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            channel,
            healthy,
            timeout,
        }
    }

    /// Human readable status line.
    #[must_use]
    pub fn notification(&self) -> String {
        if self.healthy {
            format!("[{}] Connection is alive", self.timestamp)
        } else {
            format!(
                "[{}] {}s timeout is elapsed",
                self.timestamp,
                self.timeout.as_secs_f64()
            )
        }
    }
}

/// Lifecycle state of a single channel socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Socket open has started.
    Initiated,
    /// Socket is connected.
    Established,
    /// Socket has been closed.
    Closed,
}

/// Event for the presentation layer's status sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Read channel lifecycle change.
    Read(ConnectionState),
    /// Send channel lifecycle change.
    Send(ConnectionState),
    /// Authentication resolved the session nickname.
    NicknameResolved(String),
}

impl StatusEvent {
    /// Lifecycle event for the given channel.
    #[must_use]
    pub const fn channel(kind: ChannelKind, state: ConnectionState) -> Self {
        match kind {
            ChannelKind::Read => Self::Read(state),
            ChannelKind::Send => Self::Send(state),
        }
    }
}
