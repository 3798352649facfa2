//! SSE event framing.
//!
//! An event is written as an `event:` line, optional `id:` and `retry:`
//! lines, one `data:` line per data line and a blank terminator line.
//! Every framed line ends with `\n`.
//!
//! SSE clients end a line at `\r\n`, `\r` or `\n`, so values are split
//! on all three before they are prefixed.

use crate::consts::{EventType, DEFAULT_RETRY_DURATION_MS};
use crate::options::{non_default, EventOptions};

/// A single Datastar event before framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastarEvent {
    pub event_type: EventType,
    /// Data lines without the `data: ` prefix.
    pub data_lines: Vec<String>,
    pub options: EventOptions,
}

impl DatastarEvent {
    pub fn new(event_type: EventType, data_lines: Vec<String>, options: EventOptions) -> Self {
        Self {
            event_type,
            data_lines,
            options,
        }
    }

    /// Frame this event into its wire lines.
    pub fn to_lines(&self) -> Vec<String> {
        frame_event(self.event_type, &self.data_lines, &self.options)
    }

    /// Frame this event into a single string ready to be written.
    pub fn to_text(&self) -> String {
        self.to_lines().concat()
    }
}

/// Frame one event into its ordered wire lines.
pub fn frame_event(
    event_type: EventType,
    data_lines: &[String],
    options: &EventOptions,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(data_lines.len() + 4);
    lines.push(format!("event: {event_type}\n"));

    // Line breaks cannot be represented inside a field, so they are dropped.
    if let Some(event_id) = options.event_id.as_deref() {
        let event_id = event_id.replace(['\r', '\n'], "");
        if !event_id.is_empty() {
            lines.push(format!("id: {event_id}\n"));
        }
    }

    if let Some(retry) = non_default(options.retry_duration, &DEFAULT_RETRY_DURATION_MS) {
        lines.push(format!("retry: {retry}\n"));
    }

    lines.extend(data_lines.iter().map(|line| format!("data: {line}\n")));
    lines.push("\n".to_string());
    lines
}

/// Split `value` into physical lines at `\r\n`, `\r` or `\n`.
///
/// Like [`str::lines`], an empty value has no lines and a single trailing
/// terminator does not start a new line.
pub(crate) fn physical_lines(value: &str) -> impl Iterator<Item = &str> {
    let body = value
        .strip_suffix("\r\n")
        .or_else(|| value.strip_suffix(['\r', '\n']))
        .unwrap_or(value);
    let empty = value.is_empty();
    body.split("\r\n")
        .flat_map(|part| part.split(['\r', '\n']))
        .filter(move |_| !empty)
}

/// Split `value` into `<prefix> <line>` data lines, one per physical line.
pub(crate) fn prefixed_lines<'a>(
    prefix: &'a str,
    value: &'a str,
) -> impl Iterator<Item = String> + 'a {
    physical_lines(value).map(move |line| format!("{prefix} {line}"))
}
