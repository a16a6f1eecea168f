//! Connection parameters shared by both channels.

use std::time::Duration;

use thiserror::Error;

/// Parameter validation error.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Host must not be empty")]
    EmptyHost,
    #[error("Port must be non-zero ({0} port)")]
    ZeroPort(&'static str),
    #[error("Timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
}

/// Immutable connection parameters.
///
/// Built once at the boundary and shared read-only by the supervisor and
/// its channels. Nothing downstream reads the environment directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    host: String,
    read_port: u16,
    send_port: u16,
    token: String,
    timeout: Duration,
}

impl ConnectionParameters {
    /// Create validated connection parameters.
    ///
    /// # Errors
    /// Returns error if the host is empty, a port is zero or the timeout is
    /// not a finite positive number of seconds.
    pub fn new(
        host: impl Into<String>,
        read_port: u16,
        send_port: u16,
        token: impl Into<String>,
        timeout_secs: f64,
    ) -> Result<Self, ParamsError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ParamsError::EmptyHost);
        }
        if read_port == 0 {
            return Err(ParamsError::ZeroPort("read"));
        }
        if send_port == 0 {
            return Err(ParamsError::ZeroPort("send"));
        }
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(ParamsError::InvalidTimeout(timeout_secs));
        }
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .map_err(|_| ParamsError::InvalidTimeout(timeout_secs))?;

        Ok(Self {
            host,
            read_port,
            send_port,
            token: token.into(),
            timeout,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn read_port(&self) -> u16 {
        self.read_port
    }

    #[must_use]
    pub const fn send_port(&self) -> u16 {
        self.send_port
    }

    /// Durable account hash used to authenticate the send channel.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Bound applied to every read, flush and handshake. Also the
    /// reconnect delay.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}
