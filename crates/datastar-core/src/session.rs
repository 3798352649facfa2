//! Stream session options shared by the transport adapters.
//!
//! The callbacks are boxed futures so that any executor can drive them;
//! this module does not depend on an async runtime.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

/// Error type returned by stream handlers and passed to `on_error`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type AbortCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;
type ErrorCallback = Box<dyn FnOnce(BoxError) -> BoxFuture<'static, ()> + Send>;

/// Options controlling the lifecycle of one SSE stream.
#[derive(Default)]
pub struct StreamOptions {
    /// Keep the connection open after the handler returns, until the
    /// generator is closed or the client disconnects.
    pub keepalive: bool,
    /// Extra response headers, sent after the SSE headers.
    pub headers: Vec<(String, String)>,
    on_abort: Option<AbortCallback>,
    on_error: Option<ErrorCallback>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Run `callback` when the client disconnects or the handler fails.
    pub fn on_abort<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_abort = Some(Box::new(move || callback().boxed()));
        self
    }

    /// Handle a handler failure instead of surfacing it to the caller.
    pub fn on_error<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(BoxError) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Box::new(move |err: BoxError| callback(err).boxed()));
        self
    }

    /// Run the abort callback, at most once.
    pub async fn abort(&mut self) {
        if let Some(callback) = self.on_abort.take() {
            callback().await;
        }
    }

    /// Hand `err` to the error callback.
    ///
    /// Returns the error back when no callback is registered so the caller
    /// can surface it.
    pub async fn handle_error(&mut self, err: BoxError) -> Option<BoxError> {
        match self.on_error.take() {
            Some(callback) => {
                callback(err).await;
                None
            }
            None => Some(err),
        }
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("keepalive", &self.keepalive)
            .field("headers", &self.headers)
            .field("on_abort", &self.on_abort.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
