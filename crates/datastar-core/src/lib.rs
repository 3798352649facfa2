//! # datastar-core
//!
//! Core Datastar event generation and signal parsing.
//!
//! This crate provides:
//! - The wire vocabulary (event types, data-line prefixes, patch modes, defaults)
//! - Option types for every emitting operation
//! - SSE event framing
//! - The [`ServerSentEventGenerator`] trait with all semantic operations
//! - Signal parsing from query strings and request bodies
//! - Stream session options shared by the transport adapters
//!
//! This crate is intentionally runtime-agnostic and contains no I/O,
//! making it usable from any transport. Adapters implement
//! [`ServerSentEventGenerator::send`] to push framed text onto their
//! connection.

pub mod consts;
pub mod event;
pub mod generator;
pub mod options;
pub mod session;
pub mod signals;

pub use consts::{ElementPatchMode, EventType, Namespace};
pub use event::{frame_event, DatastarEvent};
pub use generator::{DatastarError, LineGenerator, ServerSentEventGenerator};
pub use options::{
    EventOptions, ExecuteScriptOptions, PatchElementsOptions, PatchSignalsOptions,
    ScriptAttributes,
};
pub use session::{BoxError, StreamOptions};
pub use signals::{body_signals, parse_signals, query_signals, signals_into, SignalParseError, Signals};
