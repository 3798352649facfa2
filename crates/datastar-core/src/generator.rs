//! The Datastar event generator.
//!
//! [`ServerSentEventGenerator`] turns semantic intents (patch elements,
//! patch signals, execute script, remove elements, remove signals) into
//! framed SSE lines. Transports implement [`ServerSentEventGenerator::send`]
//! by framing with [`frame_event`] and pushing the joined text onto their
//! connection; every other operation is provided.

use serde::Serialize;
use thiserror::Error;

use crate::consts::{
    ElementPatchMode, EventType, AUTO_REMOVE_ATTRIBUTE, DATALINE_ELEMENTS, DATALINE_MODE,
    DATALINE_NAMESPACE, DATALINE_ONLY_IF_MISSING, DATALINE_SELECTOR, DATALINE_SIGNALS,
    DATALINE_USE_VIEW_TRANSITION, DEFAULT_AUTO_REMOVE, DEFAULT_ONLY_IF_MISSING,
    DEFAULT_USE_VIEW_TRANSITION,
};
use crate::event::{frame_event, prefixed_lines};
use crate::options::{
    non_default, EventOptions, ExecuteScriptOptions, PatchElementsOptions, PatchSignalsOptions,
};

/// Errors raised by the emitting operations.
///
/// These represent programmer error and are returned before anything is
/// written to the connection.
#[derive(Debug, Error)]
pub enum DatastarError {
    /// The patch mode is not one of the eight valid modes.
    #[error("invalid patch mode \"{mode}\", valid modes: {valid}")]
    InvalidMode { mode: String, valid: &'static str },

    /// A required parameter is missing or empty.
    #[error("{0} is required")]
    RequiredParameter(&'static str),

    /// The event id contains a line break, which would end the `id:` field.
    #[error("event id must not contain line breaks: {0:?}")]
    InvalidEventId(String),

    /// Signals could not be serialized to JSON.
    #[error("failed to serialize signals: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Generator of Datastar SSE events.
pub trait ServerSentEventGenerator {
    /// Frame one event and deliver it.
    ///
    /// Implementations must return the framed lines exactly as produced by
    /// [`frame_event`].
    fn send(&self, event_type: EventType, data_lines: Vec<String>, options: &EventOptions)
        -> Vec<String>;

    /// Close the underlying connection. Further events are dropped.
    fn close(&self);

    /// Patch HTML elements into the DOM.
    fn patch_elements(
        &self,
        elements: &str,
        options: &PatchElementsOptions,
    ) -> Result<Vec<String>, DatastarError> {
        let mode = options.mode.clone().unwrap_or_default();
        if let ElementPatchMode::Unknown(mode) = mode {
            return Err(DatastarError::InvalidMode {
                mode,
                valid: ElementPatchMode::VALID_MODES,
            });
        }

        check_event(&options.event)?;

        // A blank selector does not count as a removal target.
        let selector = options.selector.as_deref().filter(|s| !is_blank(s));
        let remove_with_selector = mode == ElementPatchMode::Remove && selector.is_some();
        if !remove_with_selector {
            require(elements, "elements")?;
        }

        let mut data_lines = Vec::new();
        if let Some(mode) = non_default(Some(mode), &ElementPatchMode::default()) {
            data_lines.extend(prefixed_lines(DATALINE_MODE, mode.as_str()));
        }
        if let Some(selector) = selector {
            data_lines.extend(prefixed_lines(DATALINE_SELECTOR, selector));
        }
        if let Some(namespace) = options.namespace {
            data_lines.extend(prefixed_lines(DATALINE_NAMESPACE, namespace.as_str()));
        }
        if let Some(use_view_transition) =
            non_default(options.use_view_transition, &DEFAULT_USE_VIEW_TRANSITION)
        {
            data_lines.push(format!(
                "{DATALINE_USE_VIEW_TRANSITION} {use_view_transition}"
            ));
        }
        if !(remove_with_selector && is_blank(elements)) {
            data_lines.extend(prefixed_lines(DATALINE_ELEMENTS, elements));
        }

        Ok(self.send(EventType::PatchElements, data_lines, &options.event))
    }

    /// Patch signals into the client signal store.
    ///
    /// `signals` is JSON text applied as a JSON Merge Patch (RFC 7386).
    fn patch_signals(
        &self,
        signals: &str,
        options: &PatchSignalsOptions,
    ) -> Result<Vec<String>, DatastarError> {
        require(signals, "signals")?;
        check_event(&options.event)?;

        let mut data_lines = Vec::new();
        if let Some(only_if_missing) = non_default(options.only_if_missing, &DEFAULT_ONLY_IF_MISSING)
        {
            data_lines.push(format!("{DATALINE_ONLY_IF_MISSING} {only_if_missing}"));
        }
        data_lines.extend(prefixed_lines(DATALINE_SIGNALS, signals));

        Ok(self.send(EventType::PatchSignals, data_lines, &options.event))
    }

    /// Serialize `signals` to JSON and patch them into the signal store.
    fn patch_signals_json<T>(
        &self,
        signals: &T,
        options: &PatchSignalsOptions,
    ) -> Result<Vec<String>, DatastarError>
    where
        T: Serialize + ?Sized,
        Self: Sized,
    {
        let json = serde_json::to_string(signals)?;
        self.patch_signals(&json, options)
    }

    /// Append a `<script>` element to the document body.
    fn execute_script(
        &self,
        script: &str,
        options: &ExecuteScriptOptions,
    ) -> Result<Vec<String>, DatastarError> {
        let mut tag = String::from("<script");
        if let Some(attributes) = &options.attributes {
            tag.push_str(&attributes.render());
        }
        if options.auto_remove.unwrap_or(DEFAULT_AUTO_REMOVE) {
            tag.push(' ');
            tag.push_str(AUTO_REMOVE_ATTRIBUTE);
        }
        tag.push('>');
        tag.push_str(script);
        tag.push_str("</script>");

        let patch = PatchElementsOptions {
            selector: Some("body".to_string()),
            mode: Some(ElementPatchMode::Append),
            event: options.event.clone(),
            ..Default::default()
        };
        self.patch_elements(&tag, &patch)
    }

    /// Remove elements from the DOM, either by `selector` or by the ids of
    /// the top-level `elements`.
    fn remove_elements(
        &self,
        selector: Option<&str>,
        elements: Option<&str>,
        options: &PatchElementsOptions,
    ) -> Result<Vec<String>, DatastarError> {
        let selector = selector.filter(|s| !is_blank(s));
        let elements = elements.unwrap_or_default();
        if selector.is_none() && is_blank(elements) {
            return Err(DatastarError::RequiredParameter("selector or elements"));
        }

        let patch = PatchElementsOptions {
            selector: selector.map(str::to_string),
            mode: Some(ElementPatchMode::Remove),
            ..options.clone()
        };
        self.patch_elements(elements, &patch)
    }

    /// Remove signals from the client signal store.
    ///
    /// Each key is set to `null` in a JSON Merge Patch, which deletes it on
    /// the client. Keys keep their given order. Pass a single key as
    /// `["key"]`.
    fn remove_signals<I, K>(
        &self,
        keys: I,
        options: &PatchSignalsOptions,
    ) -> Result<Vec<String>, DatastarError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        Self: Sized,
    {
        let mut patch = String::from("{");
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                patch.push(',');
            }
            let key: String = key.into();
            patch.push_str(&serde_json::to_string(&key)?);
            patch.push_str(":null");
        }
        patch.push('}');
        self.patch_signals(&patch, options)
    }
}

/// A generator without a transport: every operation only returns the
/// framed lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineGenerator;

impl ServerSentEventGenerator for LineGenerator {
    fn send(
        &self,
        event_type: EventType,
        data_lines: Vec<String>,
        options: &EventOptions,
    ) -> Vec<String> {
        frame_event(event_type, &data_lines, options)
    }

    fn close(&self) {}
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_event(options: &EventOptions) -> Result<(), DatastarError> {
    match options.event_id.as_deref() {
        Some(id) if id.contains(['\r', '\n']) => Err(DatastarError::InvalidEventId(id.to_string())),
        _ => Ok(()),
    }
}

fn require(value: &str, name: &'static str) -> Result<(), DatastarError> {
    if is_blank(value) {
        return Err(DatastarError::RequiredParameter(name));
    }
    Ok(())
}
