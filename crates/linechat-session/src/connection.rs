//! Scoped socket acquisition for a single channel.

use linechat_core::{ChannelKind, ConnectionState, StatusEvent};
use linechat_protocol::LineCodec;
use tokio::{
    io::AsyncWriteExt,
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};

use crate::SessionError;

/// Why a channel loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelExit {
    /// The peer closed the socket or sent undecodable bytes.
    StreamEnded(ChannelKind),
    /// The presentation layer dropped the outgoing queue.
    SourceClosed,
}

/// Emits `Initiated` on creation and `Closed` on drop.
struct StatusGuard {
    kind: ChannelKind,
    status: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusGuard {
    fn initiated(kind: ChannelKind, status: Option<mpsc::UnboundedSender<StatusEvent>>) -> Self {
        let guard = Self { kind, status };
        guard.emit(ConnectionState::Initiated);
        guard
    }

    fn emit(&self, state: ConnectionState) {
        if let Some(status) = &self.status {
            let _ = status.send(StatusEvent::channel(self.kind, state));
        }
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.emit(ConnectionState::Closed);
        tracing::debug!(channel = %self.kind, "Connection closed");
    }
}

/// An open channel socket.
///
/// Dropping it closes the socket and emits `Closed` exactly once, whether
/// the owning loop returned, failed or was cancelled.
pub struct ChannelConnection {
    pub reader: LineCodec<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
    // Declared last: the socket halves are dropped before `Closed` is sent.
    guard: StatusGuard,
}

impl ChannelConnection {
    /// Connect to `host:port`, reporting lifecycle changes to `status`.
    ///
    /// # Errors
    /// Returns `Connect` if the address cannot be resolved or the server
    /// refuses the connection. No retry happens here.
    pub async fn open(
        host: &str,
        port: u16,
        kind: ChannelKind,
        status: Option<mpsc::UnboundedSender<StatusEvent>>,
    ) -> Result<Self, SessionError> {
        let guard = StatusGuard::initiated(kind, status);

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| SessionError::Connect {
                channel: kind,
                host: host.to_string(),
                port,
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(channel = %kind, "Failed to set TCP_NODELAY: {e}");
        }

        tracing::info!(channel = %kind, host, port, "Connection established");
        guard.emit(ConnectionState::Established);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: LineCodec::new(read_half),
            writer: write_half,
            guard,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.guard.kind
    }

    /// Shut down the write side gracefully, then release the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(channel = %self.kind(), "Socket shutdown failed: {e}");
        }
    }
}
