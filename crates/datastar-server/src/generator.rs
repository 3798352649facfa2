//! Channel-backed event generator feeding a hyper response body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use datastar_core::{frame_event, EventOptions, EventType, ServerSentEventGenerator};

/// Messages from generator handles to the response body.
#[derive(Debug)]
pub(crate) enum Outgoing {
    Event(String),
    /// End the body.
    Close,
}

/// Generator handle for one socket stream.
///
/// Cloning is cheap; all clones feed the same connection, in order.
/// Sending is synchronous: framed text is queued and hyper writes it as
/// the body is polled.
#[derive(Debug, Clone)]
pub struct SocketGenerator {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: Arc<AtomicBool>,
}

impl SocketGenerator {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generator = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (generator, rx)
    }

    /// Whether [`ServerSentEventGenerator::close`] was called on any clone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolve once the response body has been dropped.
    ///
    /// hyper drops the body when the connection goes away, or after it
    /// finished because the stream was closed.
    pub(crate) async fn body_dropped(&self) {
        self.tx.closed().await;
    }

    /// Resolve once the client went away. Never resolves after a close.
    pub(crate) async fn client_gone(&self) {
        self.body_dropped().await;
        if self.is_closed() {
            std::future::pending::<()>().await;
        }
    }
}

impl ServerSentEventGenerator for SocketGenerator {
    fn send(
        &self,
        event_type: EventType,
        data_lines: Vec<String>,
        options: &EventOptions,
    ) -> Vec<String> {
        let lines = frame_event(event_type, &data_lines, options);
        if self.is_closed() || self.tx.send(Outgoing::Event(lines.concat())).is_err() {
            trace!(%event_type, "dropping event for closed stream");
        }
        lines
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Outgoing::Close);
        }
    }
}
