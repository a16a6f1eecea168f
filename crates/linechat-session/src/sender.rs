//! Send channel: authenticates, then drains the outgoing queue.

use std::{sync::Arc, time::Duration};

use linechat_core::{ChannelKind, ConnectionParameters, LivenessEvent, StatusEvent};
use linechat_protocol::{LineCodec, authorize, encode_message, send_frame};
use tokio::{
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::mpsc,
    time::{self, Instant},
};

use crate::{ChannelConnection, ChannelExit, SessionError};

/// Owns the write-capable socket for one connected unit.
pub struct SendChannel {
    params: Arc<ConnectionParameters>,
    liveness: mpsc::UnboundedSender<LivenessEvent>,
    status: mpsc::UnboundedSender<StatusEvent>,
    keepalive: Option<Duration>,
}

impl SendChannel {
    #[must_use]
    pub const fn new(
        params: Arc<ConnectionParameters>,
        liveness: mpsc::UnboundedSender<LivenessEvent>,
        status: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            params,
            liveness,
            status,
            keepalive: None,
        }
    }

    /// Write an empty frame after `idle` without outgoing messages.
    #[must_use]
    pub const fn with_keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = idle;
        self
    }

    /// Authenticate, then send queued messages until the unit is cancelled.
    ///
    /// Messages stay in `outgoing` until this channel takes them, so a
    /// reconnect does not lose queued messages.
    ///
    /// # Errors
    /// Returns `InvalidToken` if the server rejects the token, or a
    /// transient error if the socket cannot be opened or the handshake
    /// stalls.
    pub async fn run(
        &self,
        outgoing: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<ChannelExit, SessionError> {
        let (conn, _nickname) = self.authenticate().await?;
        self.serve(conn, outgoing).await
    }

    /// Open the send socket and complete authentication within `timeout`.
    ///
    /// Returns the authenticated connection and the resolved nickname.
    ///
    /// # Errors
    /// Returns `InvalidToken` if the server rejects the token, `Connect` if
    /// the socket cannot be opened, or `HandshakeTimeout` if the server
    /// does not answer in time.
    pub async fn authenticate(&self) -> Result<(ChannelConnection, String), SessionError> {
        let timeout = self.params.timeout();
        let mut conn = ChannelConnection::open(
            self.params.host(),
            self.params.send_port(),
            ChannelKind::Send,
            Some(self.status.clone()),
        )
        .await?;

        let handshake = authorize(&mut conn.reader, &mut conn.writer, self.params.token());
        let nickname = match time::timeout(timeout, handshake).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(?timeout, "Authentication timed out");
                self.report(false);
                return Err(SessionError::HandshakeTimeout(timeout));
            }
        };
        self.report(true);
        tracing::info!(%nickname, "Authenticated on send channel");
        let _ = self.status.send(StatusEvent::NicknameResolved(nickname.clone()));
        Ok((conn, nickname))
    }

    /// Send queued messages over an authenticated connection.
    ///
    /// # Errors
    /// Returns error if the socket fails mid-stream.
    pub async fn serve(
        &self,
        mut conn: ChannelConnection,
        outgoing: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<ChannelExit, SessionError> {
        let (pings_tx, mut pings_rx) = mpsc::unbounded_channel();
        tokio::select! {
            exit = self.drain_acks(&mut conn.reader, &mut pings_rx) => exit,
            exit = self.write_loop(&mut conn.writer, outgoing, &pings_tx) => exit,
        }
    }

    async fn write_loop(
        &self,
        writer: &mut OwnedWriteHalf,
        outgoing: &mut mpsc::UnboundedReceiver<String>,
        pings: &mpsc::UnboundedSender<()>,
    ) -> Result<ChannelExit, SessionError> {
        loop {
            let (frame, is_ping) = match self.keepalive {
                Some(idle) => match time::timeout(idle, outgoing.recv()).await {
                    Ok(next) => (next.map(|text| encode_message(&text)), false),
                    Err(_) => {
                        tracing::debug!("Sending keepalive frame");
                        (Some(encode_message("")), true)
                    }
                },
                None => (outgoing.recv().await.map(|text| encode_message(&text)), false),
            };
            let Some(frame) = frame else {
                tracing::info!("Outgoing queue closed");
                return Ok(ChannelExit::SourceClosed);
            };

            self.write_frame(writer, &frame).await?;
            if is_ping {
                let _ = pings.send(());
            }
        }
    }

    /// Write one frame to completion, reporting every missed window.
    ///
    /// A stalled write is resumed rather than dropped, so a partially sent
    /// frame is never followed by the start of the next one.
    async fn write_frame(&self, writer: &mut OwnedWriteHalf, frame: &str) -> Result<(), SessionError> {
        let timeout = self.params.timeout();
        let write = send_frame(writer, frame);
        tokio::pin!(write);
        loop {
            match time::timeout(timeout, &mut write).await {
                Ok(Ok(())) => {
                    self.report(true);
                    return Ok(());
                }
                Ok(Err(e)) => return Err(SessionError::Io(e)),
                Err(_) => {
                    tracing::warn!(?timeout, "Send flush timed out");
                    self.report(false);
                }
            }
        }
    }

    /// Consume the server's reply lines so its writes never back up.
    ///
    /// After a keepalive frame a reply is expected within `timeout`;
    /// silence is reported as an unhealthy event.
    async fn drain_acks(
        &self,
        reader: &mut LineCodec<OwnedReadHalf>,
        pings: &mut mpsc::UnboundedReceiver<()>,
    ) -> Result<ChannelExit, SessionError> {
        let timeout = self.params.timeout();
        let mut deadline: Option<Instant> = None;
        loop {
            tokio::select! {
                line = reader.next_line() => match line {
                    Ok(line) => {
                        tracing::debug!(%line, "Server acknowledgement");
                        if deadline.take().is_some() {
                            self.report(true);
                        }
                    }
                    Err(e) if e.is_end_of_stream() => {
                        tracing::info!("Send stream ended: {e}");
                        return Ok(ChannelExit::StreamEnded(ChannelKind::Send));
                    }
                    Err(e) => return Err(e.into()),
                },
                Some(()) = pings.recv(), if deadline.is_none() => {
                    deadline = Some(Instant::now() + timeout);
                }
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracing::warn!(?timeout, "No reply to keepalive");
                    deadline = None;
                    self.report(false);
                }
            }
        }
    }

    fn report(&self, healthy: bool) {
        let timeout = self.params.timeout();
        let event = if healthy {
            LivenessEvent::healthy(ChannelKind::Send, timeout)
        } else {
            LivenessEvent::unhealthy(ChannelKind::Send, timeout)
        };
        let _ = self.liveness.send(event);
    }
}
