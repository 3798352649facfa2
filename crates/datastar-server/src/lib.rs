//! # datastar-server
//!
//! Datastar SSE transport for plain HTTP/1 sockets, served by hyper.
//!
//! This crate provides:
//! - [`IncomingRequest`]: a routed request with awaited, size-limited body
//!   reads, including [`IncomingRequest::read_signals`]
//! - [`stream`]: the SSE session controller, streaming events as the
//!   response body and noticing when the client goes away
//! - [`SocketServer`]: a small tokio accept loop routing paths to handlers
//!
//! Any `AsyncRead`/`AsyncWrite` pair works as a connection through
//! [`SocketServer::serve_connection`], so tests can drive the server over
//! `tokio::io::duplex`.

pub mod generator;
pub mod http;
pub mod server;
pub mod stream;

pub use datastar_core::{
    BoxError, ElementPatchMode, EventOptions, ExecuteScriptOptions, PatchElementsOptions,
    PatchSignalsOptions, ServerSentEventGenerator, SignalParseError, Signals, StreamOptions,
};
pub use generator::SocketGenerator;
pub use http::{text_response, HttpError, IncomingRequest, ResponseBody};
pub use server::{ServerConfig, SocketServer};
pub use stream::{stream, StreamError};
