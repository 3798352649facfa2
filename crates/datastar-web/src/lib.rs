//! # datastar-web
//!
//! Datastar SSE for axum.
//!
//! This crate provides:
//! - [`stream`]: returns a streaming SSE [`axum::response::Response`] whose
//!   body is fed by a [`WebGenerator`]
//! - [`read_signals`] and the [`ReadSignals`] extractor for client signals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum::{http::Version, routing::get, Router};
//! use datastar_web::{stream, ReadSignals, ServerSentEventGenerator, Signals, StreamOptions};
//!
//! async fn merge(version: Version, ReadSignals(signals): ReadSignals<Signals>) -> Response {
//!     stream(version, move |sse| async move {
//!         sse.patch_elements("<div id=\"toMerge\">Hello</div>", &Default::default())?;
//!         Ok(())
//!     }, StreamOptions::new())
//! }
//!
//! let app = Router::new().route("/merge", get(merge));
//! ```

pub mod generator;
pub mod signals;
pub mod stream;

pub use datastar_core::{
    BoxError, ElementPatchMode, EventOptions, ExecuteScriptOptions, PatchElementsOptions,
    PatchSignalsOptions, ServerSentEventGenerator, SignalParseError, Signals, StreamOptions,
};
pub use generator::WebGenerator;
pub use signals::{read_signals, read_signals_as, ReadSignals, SignalsRejection};
pub use stream::stream;
