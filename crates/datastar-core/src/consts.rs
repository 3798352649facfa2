//! Datastar wire vocabulary.
//!
//! Event type names, data-line prefixes, patch modes, namespaces and the
//! default values that are elided from the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query parameter carrying JSON-encoded signals on GET requests.
pub const DATASTAR_QUERY_PARAM: &str = "datastar";

// ============================================================================
// Data-line prefixes
// ============================================================================

pub const DATALINE_SELECTOR: &str = "selector";
pub const DATALINE_MODE: &str = "mode";
pub const DATALINE_ELEMENTS: &str = "elements";
pub const DATALINE_NAMESPACE: &str = "namespace";
pub const DATALINE_USE_VIEW_TRANSITION: &str = "useViewTransition";
pub const DATALINE_SIGNALS: &str = "signals";
pub const DATALINE_ONLY_IF_MISSING: &str = "onlyIfMissing";
/// Reserved for path-based signal removal. No operation emits it yet;
/// `remove_signals` sends a merge patch of `null`s instead.
pub const DATALINE_PATHS: &str = "paths";

/// Every data-line prefix of the wire protocol.
pub const DATALINE_PREFIXES: [&str; 8] = [
    DATALINE_SELECTOR,
    DATALINE_MODE,
    DATALINE_ELEMENTS,
    DATALINE_NAMESPACE,
    DATALINE_USE_VIEW_TRANSITION,
    DATALINE_SIGNALS,
    DATALINE_ONLY_IF_MISSING,
    DATALINE_PATHS,
];

// ============================================================================
// Defaults
// ============================================================================

/// Retry duration (ms) the client assumes when no `retry:` line is sent.
pub const DEFAULT_RETRY_DURATION_MS: u64 = 1000;
pub const DEFAULT_USE_VIEW_TRANSITION: bool = false;
pub const DEFAULT_ONLY_IF_MISSING: bool = false;
pub const DEFAULT_AUTO_REMOVE: bool = true;

/// Attribute that makes an executed `<script>` remove itself.
pub const AUTO_REMOVE_ATTRIBUTE: &str = r#"data-effect="el.remove()""#;

/// Headers every SSE response is opened with.
pub const SSE_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
];

/// The SSE event types understood by the Datastar client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Patches HTML elements into the DOM
    PatchElements,
    /// Patches signals into the signal store
    PatchSignals,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PatchElements => "datastar-patch-elements",
            EventType::PatchSignals => "datastar-patch-signals",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mode in which elements are patched into the DOM.
///
/// Strings that are not one of the eight known modes are kept as
/// [`ElementPatchMode::Unknown`] so that the emitting operation can reject
/// them with a descriptive error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementPatchMode {
    /// Morph entire element, preserving state
    #[default]
    Outer,
    /// Morph inner HTML only, preserving state
    Inner,
    /// Replace entire element, reset state
    Replace,
    /// Insert at beginning inside target
    Prepend,
    /// Insert at end inside target
    Append,
    /// Insert before target element
    Before,
    /// Insert after target element
    After,
    /// Remove target element from DOM
    Remove,
    /// Any other value, rejected when emitted.
    Unknown(String),
}

impl ElementPatchMode {
    /// All valid modes, in wire order.
    pub const ALL: [ElementPatchMode; 8] = [
        ElementPatchMode::Outer,
        ElementPatchMode::Inner,
        ElementPatchMode::Replace,
        ElementPatchMode::Prepend,
        ElementPatchMode::Append,
        ElementPatchMode::Before,
        ElementPatchMode::After,
        ElementPatchMode::Remove,
    ];

    /// Comma-separated list of all valid modes, used in error messages.
    pub const VALID_MODES: &'static str =
        "outer, inner, replace, prepend, append, before, after, remove";

    pub fn as_str(&self) -> &str {
        match self {
            ElementPatchMode::Outer => "outer",
            ElementPatchMode::Inner => "inner",
            ElementPatchMode::Replace => "replace",
            ElementPatchMode::Prepend => "prepend",
            ElementPatchMode::Append => "append",
            ElementPatchMode::Before => "before",
            ElementPatchMode::After => "after",
            ElementPatchMode::Remove => "remove",
            ElementPatchMode::Unknown(value) => value,
        }
    }

    /// Whether this is one of the eight valid modes.
    pub fn is_valid(&self) -> bool {
        !matches!(self, ElementPatchMode::Unknown(_))
    }
}

impl From<&str> for ElementPatchMode {
    fn from(value: &str) -> Self {
        match value {
            "outer" => ElementPatchMode::Outer,
            "inner" => ElementPatchMode::Inner,
            "replace" => ElementPatchMode::Replace,
            "prepend" => ElementPatchMode::Prepend,
            "append" => ElementPatchMode::Append,
            "before" => ElementPatchMode::Before,
            "after" => ElementPatchMode::After,
            "remove" => ElementPatchMode::Remove,
            other => ElementPatchMode::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ElementPatchMode {
    fn from(value: String) -> Self {
        match ElementPatchMode::from(value.as_str()) {
            ElementPatchMode::Unknown(_) => ElementPatchMode::Unknown(value),
            known => known,
        }
    }
}

impl From<ElementPatchMode> for String {
    fn from(mode: ElementPatchMode) -> Self {
        match mode {
            ElementPatchMode::Unknown(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ElementPatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace used by the client when creating patched elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Svg,
    MathMl,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Svg => "svg",
            Namespace::MathMl => "mathml",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
