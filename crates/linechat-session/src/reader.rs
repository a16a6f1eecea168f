//! Read channel: incoming chat lines to the display and history sinks.

use std::sync::Arc;

use linechat_core::{ChannelKind, ChatMessage, ConnectionParameters, LivenessEvent, StatusEvent};
use tokio::{sync::mpsc, time};

use crate::{ChannelConnection, ChannelExit, SessionError};

/// Owns the read-only socket for one connected unit.
pub struct ReadChannel {
    params: Arc<ConnectionParameters>,
    display: mpsc::UnboundedSender<ChatMessage>,
    persist: mpsc::UnboundedSender<ChatMessage>,
    liveness: mpsc::UnboundedSender<LivenessEvent>,
    status: mpsc::UnboundedSender<StatusEvent>,
    muted: Arc<[String]>,
}

impl ReadChannel {
    #[must_use]
    pub fn new(
        params: Arc<ConnectionParameters>,
        display: mpsc::UnboundedSender<ChatMessage>,
        persist: mpsc::UnboundedSender<ChatMessage>,
        liveness: mpsc::UnboundedSender<LivenessEvent>,
        status: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            params,
            display,
            persist,
            liveness,
            status,
            muted: Arc::from(Vec::new()),
        }
    }

    /// Skip lines whose nickname contains any of `patterns` (case-insensitive).
    #[must_use]
    pub fn with_muted(mut self, patterns: Arc<[String]>) -> Self {
        self.muted = patterns;
        self
    }

    /// Stream lines until the peer closes the socket.
    ///
    /// A read that misses the timeout window is reported as an unhealthy
    /// liveness event and the loop keeps reading.
    ///
    /// # Errors
    /// Returns error if the socket cannot be opened or fails mid-stream.
    pub async fn run(&self) -> Result<ChannelExit, SessionError> {
        let timeout = self.params.timeout();
        let mut conn = ChannelConnection::open(
            self.params.host(),
            self.params.read_port(),
            ChannelKind::Read,
            Some(self.status.clone()),
        )
        .await?;

        loop {
            match time::timeout(timeout, conn.reader.next_line()).await {
                Ok(Ok(line)) => {
                    self.report(true);
                    if self.is_muted(&line) {
                        tracing::debug!(%line, "Skipping muted line");
                        continue;
                    }
                    let msg = ChatMessage::stamp(&line);
                    let _ = self.display.send(msg.clone());
                    let _ = self.persist.send(msg);
                }
                Ok(Err(e)) if e.is_end_of_stream() => {
                    tracing::info!("Read stream ended: {e}");
                    return Ok(ChannelExit::StreamEnded(ChannelKind::Read));
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    tracing::warn!(?timeout, "Read timed out");
                    self.report(false);
                }
            }
        }
    }

    fn report(&self, healthy: bool) {
        let timeout = self.params.timeout();
        let event = if healthy {
            LivenessEvent::healthy(ChannelKind::Read, timeout)
        } else {
            LivenessEvent::unhealthy(ChannelKind::Read, timeout)
        };
        let _ = self.liveness.send(event);
    }

    fn is_muted(&self, line: &str) -> bool {
        if self.muted.is_empty() {
            return false;
        }
        let nickname = line.split(':').next().unwrap_or_default().to_lowercase();
        self.muted
            .iter()
            .any(|pattern| nickname.contains(&pattern.to_lowercase()))
    }
}
