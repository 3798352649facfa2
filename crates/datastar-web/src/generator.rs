//! Channel-backed event generator feeding an axum response body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use datastar_core::{frame_event, BoxError, EventOptions, EventType, ServerSentEventGenerator};

/// Items drained by the response body.
#[derive(Debug)]
pub(crate) enum Frame {
    Event(String),
    /// End the body normally.
    Close,
    /// End the body with an error, aborting the response.
    Fail(BoxError),
}

/// Generator handle for one streaming response.
///
/// Cloning is cheap; all clones feed the same body, in order.
#[derive(Debug, Clone)]
pub struct WebGenerator {
    tx: mpsc::UnboundedSender<Frame>,
    closed: Arc<AtomicBool>,
}

impl WebGenerator {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Frame>) {
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
    /// That happens when the client goes away, or after the body finished
    /// because the stream was closed.
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

    /// Terminate the body with `err`.
    pub(crate) fn fail(&self, err: BoxError) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Frame::Fail(err));
        }
    }
}

impl ServerSentEventGenerator for WebGenerator {
    fn send(
        &self,
        event_type: EventType,
        data_lines: Vec<String>,
        options: &EventOptions,
    ) -> Vec<String> {
        let lines = frame_event(event_type, &data_lines, options);
        if self.is_closed() || self.tx.send(Frame::Event(lines.concat())).is_err() {
            trace!(%event_type, "dropping event for closed response");
        }
        lines
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Frame::Close);
        }
    }
}
