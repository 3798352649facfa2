//! Options recognized by the emitting operations.
//!
//! Every option is optional. Values equal to their default (see
//! [`crate::consts`]) are not written to the wire.

use serde::{Deserialize, Serialize};

use crate::consts::{ElementPatchMode, Namespace};

/// Metadata shared by every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOptions {
    /// Written as the `id:` line when present and non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Reconnection delay in milliseconds, written as `retry:` unless it
    /// equals the 1000ms default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_duration: Option<u64>,
}

impl EventOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_retry_duration(mut self, retry_duration_ms: u64) -> Self {
        self.retry_duration = Some(retry_duration_ms);
        self
    }
}

/// Options for patching elements into the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchElementsOptions {
    /// CSS selector of the target element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Patch mode, `outer` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ElementPatchMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_view_transition: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Namespace>,

    #[serde(flatten)]
    pub event: EventOptions,
}

impl PatchElementsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Set the patch mode. Accepts an [`ElementPatchMode`] or a raw string;
    /// unknown strings are rejected when the event is emitted.
    pub fn with_mode(mut self, mode: impl Into<ElementPatchMode>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_use_view_transition(mut self, use_view_transition: bool) -> Self {
        self.use_view_transition = Some(use_view_transition);
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event.event_id = Some(event_id.into());
        self
    }

    pub fn with_retry_duration(mut self, retry_duration_ms: u64) -> Self {
        self.event.retry_duration = Some(retry_duration_ms);
        self
    }
}

/// Options for patching signals into the client signal store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSignalsOptions {
    /// Only set signals that do not exist yet on the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_if_missing: Option<bool>,

    #[serde(flatten)]
    pub event: EventOptions,
}

impl PatchSignalsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_only_if_missing(mut self, only_if_missing: bool) -> Self {
        self.only_if_missing = Some(only_if_missing);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event.event_id = Some(event_id.into());
        self
    }

    pub fn with_retry_duration(mut self, retry_duration_ms: u64) -> Self {
        self.event.retry_duration = Some(retry_duration_ms);
        self
    }
}

/// Attributes rendered onto a generated `<script>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAttributes {
    /// Rendered as ` key="value"` pairs, in insertion order.
    Map(Vec<(String, String)>),
    /// Each entry inserted verbatim, space-joined.
    List(Vec<String>),
}

impl ScriptAttributes {
    /// Render the attributes with a leading space, or an empty string.
    pub fn render(&self) -> String {
        match self {
            ScriptAttributes::Map(pairs) => pairs
                .iter()
                .map(|(key, value)| format!(r#" {key}="{value}""#))
                .collect(),
            ScriptAttributes::List(entries) if entries.is_empty() => String::new(),
            ScriptAttributes::List(entries) => format!(" {}", entries.join(" ")),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ScriptAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ScriptAttributes::Map(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Options for executing a script on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteScriptOptions {
    /// Remove the `<script>` element after it ran, `true` when absent.
    pub auto_remove: Option<bool>,
    pub attributes: Option<ScriptAttributes>,
    pub event: EventOptions,
}

impl ExecuteScriptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = Some(auto_remove);
        self
    }

    pub fn with_attributes(mut self, attributes: ScriptAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event.event_id = Some(event_id.into());
        self
    }

    pub fn with_retry_duration(mut self, retry_duration_ms: u64) -> Self {
        self.event.retry_duration = Some(retry_duration_ms);
        self
    }
}

/// Returns `value` only when it differs from `default`.
pub(crate) fn non_default<T: PartialEq>(value: Option<T>, default: &T) -> Option<T> {
    value.filter(|v| v != default)
}
