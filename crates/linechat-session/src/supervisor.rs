//! Reconnect loop around one connected unit of two channels and a monitor.

use std::{sync::Arc, time::Duration};

use linechat_core::{
    ChannelKind, ChatMessage, ConnectionParameters, ConnectionState, HistoryStore, LivenessEvent,
    StatusEvent,
};
use tokio::{
    sync::{mpsc, watch},
    time,
};

use crate::{
    ChannelExit, ChatHandle, FaultPolicy, HealthMonitor, InterruptHandle, ReadChannel, SendChannel,
    SessionError, TimeoutFault,
};

/// Optional behavior of the supervised channels.
#[derive(Debug, Clone, Default)]
pub struct SupervisorOptions {
    pub fault_policy: FaultPolicy,
    /// Incoming lines from these nicknames are neither shown nor saved.
    pub muted_nicknames: Vec<String>,
    /// Idle period after which the send channel writes an empty frame.
    pub keepalive: Option<Duration>,
}

/// Why a connected unit stopped.
#[derive(Debug)]
enum UnitExit {
    Interrupted,
    SourceClosed,
    Fault(TimeoutFault),
    StreamEnded(ChannelKind),
}

/// Keeps the chat connection alive until interrupted.
pub struct ConnectionSupervisor {
    params: Arc<ConnectionParameters>,
    history: HistoryStore,
    options: SupervisorOptions,
    muted: Arc<[String]>,
    display: mpsc::UnboundedSender<ChatMessage>,
    status: mpsc::UnboundedSender<StatusEvent>,
    outgoing: mpsc::UnboundedReceiver<String>,
    interrupt: watch::Receiver<bool>,
    liveness_tap: Option<mpsc::UnboundedSender<LivenessEvent>>,
}

impl ConnectionSupervisor {
    /// Create a supervisor and the handle the display layer talks to.
    #[must_use]
    pub fn new(
        params: ConnectionParameters,
        history: HistoryStore,
        options: SupervisorOptions,
    ) -> (Self, ChatHandle) {
        let (display, messages) = mpsc::unbounded_channel();
        let (status, status_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing) = mpsc::unbounded_channel();
        let (interrupt_handle, interrupt) = InterruptHandle::new();

        let supervisor = Self {
            params: Arc::new(params),
            history,
            muted: Arc::from(options.muted_nicknames.clone()),
            options,
            display,
            status,
            outgoing,
            interrupt,
            liveness_tap: None,
        };
        let handle = ChatHandle {
            messages,
            status: status_rx,
            outgoing: outgoing_tx,
            interrupt: interrupt_handle,
        };
        (supervisor, handle)
    }

    /// Receive a copy of every liveness event the monitor observes.
    #[must_use]
    pub fn with_liveness_tap(mut self, tap: mpsc::UnboundedSender<LivenessEvent>) -> Self {
        self.liveness_tap = Some(tap);
        self
    }

    /// Replay history, then connect and reconnect until interrupted.
    ///
    /// Returns once the interruption flag is set or the outgoing queue is
    /// dropped. The history writer is drained before this returns.
    ///
    /// # Errors
    /// Returns `InvalidToken` if the server rejects the token. Every other
    /// failure is retried.
    pub async fn run(mut self) -> Result<(), SessionError> {
        match self.history.replay(&self.display).await {
            Ok(count) => tracing::info!(count, "Replayed history"),
            Err(e) => tracing::warn!(
                path = %self.history.path().display(),
                "Failed to replay history: {e}"
            ),
        }

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let history = self.history.clone();
        let writer = async move {
            if let Err(e) = history.drain(persist_rx).await {
                tracing::warn!(path = %history.path().display(), "History writer failed: {e}");
            }
        };

        let (result, ()) = tokio::join!(self.reconnect_loop(persist_tx), writer);
        result
    }

    async fn reconnect_loop(
        &mut self,
        persist: mpsc::UnboundedSender<ChatMessage>,
    ) -> Result<(), SessionError> {
        let backoff = self.params.timeout();
        let mut attempt = 0u32;

        let result = loop {
            if *self.interrupt.borrow() {
                break Ok(());
            }
            attempt += 1;
            tracing::info!(attempt, host = self.params.host(), "Connecting");

            match self.run_unit(&persist).await {
                Ok(UnitExit::Interrupted) => {
                    tracing::info!("Interrupted, closing connections");
                    break Ok(());
                }
                Ok(UnitExit::SourceClosed) => {
                    tracing::info!("Outgoing queue dropped, stopping");
                    break Ok(());
                }
                Ok(UnitExit::Fault(fault)) => tracing::warn!(attempt, "{fault}"),
                Ok(UnitExit::StreamEnded(channel)) => {
                    tracing::warn!(attempt, %channel, "Stream ended");
                }
                Err(e) if e.is_terminal() => {
                    tracing::error!("{e}");
                    break Err(e);
                }
                Err(e) => tracing::warn!(attempt, "Connection failed: {e}"),
            }

            tracing::info!(?backoff, "Reconnecting after backoff");
            tokio::select! {
                () = time::sleep(backoff) => {}
                () = wait_for_interrupt(&mut self.interrupt) => break Ok(()),
            }
        };
        // Lets the history writer finish.
        drop(persist);

        if attempt == 0 {
            for channel in [ChannelKind::Read, ChannelKind::Send] {
                let _ = self
                    .status
                    .send(StatusEvent::channel(channel, ConnectionState::Closed));
            }
        }
        result
    }

    /// Authenticate, then run both channels and the monitor until the first
    /// of them finishes.
    ///
    /// The read socket is only opened once the server has accepted the
    /// token. The remaining members are dropped before this returns, which
    /// closes their sockets.
    async fn run_unit(
        &mut self,
        persist: &mpsc::UnboundedSender<ChatMessage>,
    ) -> Result<UnitExit, SessionError> {
        // Fresh per unit: events from a torn down unit never reach the next monitor.
        let (liveness_tx, mut liveness_rx) = mpsc::unbounded_channel();
        let mut interrupt = self.interrupt.clone();

        let sender = SendChannel::new(Arc::clone(&self.params), liveness_tx.clone(), self.status.clone())
            .with_keepalive(self.options.keepalive);
        let send_conn = tokio::select! {
            authenticated = sender.authenticate() => authenticated?.0,
            () = wait_for_interrupt(&mut interrupt) => return Ok(UnitExit::Interrupted),
        };

        let reader = ReadChannel::new(
            Arc::clone(&self.params),
            self.display.clone(),
            persist.clone(),
            liveness_tx,
            self.status.clone(),
        )
        .with_muted(Arc::clone(&self.muted));
        let monitor =
            HealthMonitor::new(self.options.fault_policy).with_tap(self.liveness_tap.clone());

        let exit = tokio::select! {
            exit = reader.run() => exit?,
            exit = sender.serve(send_conn, &mut self.outgoing) => exit?,
            fault = monitor.watch(&mut liveness_rx) => return Ok(UnitExit::Fault(fault)),
            () = wait_for_interrupt(&mut interrupt) => return Ok(UnitExit::Interrupted),
        };

        Ok(match exit {
            ChannelExit::StreamEnded(channel) => UnitExit::StreamEnded(channel),
            ChannelExit::SourceClosed => UnitExit::SourceClosed,
        })
    }
}

async fn wait_for_interrupt(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|interrupted| *interrupted).await.is_err() {
        // Every handle is gone, so nothing can interrupt any more.
        std::future::pending::<()>().await;
    }
}
