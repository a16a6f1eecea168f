//! Presentation-side ends of the supervisor's queues.

use std::sync::Arc;

use linechat_core::{ChatMessage, StatusEvent};
use tokio::sync::{mpsc, watch};

/// The supervisor stopped and no longer takes outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Outgoing queue is closed")]
pub struct OutgoingClosed;

/// One-shot interruption flag shared with the supervisor.
///
/// Cloning is cheap; every clone sets the same flag.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Stop the supervisor. Setting the flag twice has no further effect.
    pub fn interrupt(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("Interruption requested");
        }
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Handle held by the display layer while the supervisor runs.
#[derive(Debug)]
pub struct ChatHandle {
    /// Stamped incoming messages, history replay first.
    pub messages: mpsc::UnboundedReceiver<ChatMessage>,
    /// Connection lifecycle and nickname notifications.
    pub status: mpsc::UnboundedReceiver<StatusEvent>,
    /// Raw outgoing message texts.
    pub outgoing: mpsc::UnboundedSender<String>,
    pub interrupt: InterruptHandle,
}

impl ChatHandle {
    /// Queue a message for the send channel.
    ///
    /// # Errors
    /// Returns error if the supervisor has stopped.
    pub fn send_message(&self, text: impl Into<String>) -> Result<(), OutgoingClosed> {
        self.outgoing.send(text.into()).map_err(|_| OutgoingClosed)
    }

    /// Split into the receiving halves and the input side.
    #[must_use]
    pub fn split(
        self,
    ) -> (
        mpsc::UnboundedReceiver<ChatMessage>,
        mpsc::UnboundedReceiver<StatusEvent>,
        mpsc::UnboundedSender<String>,
        InterruptHandle,
    ) {
        (self.messages, self.status, self.outgoing, self.interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_is_sticky_and_shared() {
        let (handle, mut rx) = InterruptHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_interrupted());

        clone.interrupt();
        clone.interrupt();
        assert!(handle.is_interrupted());
        assert!(*rx.wait_for(|v| *v).await.unwrap());
    }

    #[test]
    fn test_send_message_after_shutdown() {
        let (messages_tx, messages) = mpsc::unbounded_channel();
        let (status_tx, status) = mpsc::unbounded_channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel();
        let (interrupt, _flag) = InterruptHandle::new();
        let handle = ChatHandle {
            messages,
            status,
            outgoing,
            interrupt,
        };
        drop((messages_tx, status_tx));

        handle.send_message("hello").unwrap();
        assert_eq!(outgoing_rx.try_recv().unwrap(), "hello");

        drop(outgoing_rx);
        assert_eq!(handle.send_message("late"), Err(OutgoingClosed));
    }
}
