//! Display-ready chat messages.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used as the message prefix.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M";

/// A formatted chat line: `[DD.MM.YY HH:MM] <received line>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMessage(String);

impl ChatMessage {
    /// Stamp a raw line received from the server with the current local time.
    #[must_use]
    pub fn stamp(line: &str) -> Self {
        Self::stamp_at(line, Local::now())
    }

    /// Stamp a raw line with an explicit time.
    #[must_use]
    pub fn stamp_at(line: &str, at: DateTime<Local>) -> Self {
        Self(format!("[{}] {line}", at.format(TIMESTAMP_FORMAT)))
    }

    /// Wrap a line that is already formatted (history replay).
    #[must_use]
    pub fn from_formatted(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Text after the timestamp prefix, or the whole line if there is none.
    #[must_use]
    pub fn body(&self) -> &str {
        self.0
            .strip_prefix('[')
            .and_then(|rest| rest.split_once("] "))
            .map_or(self.0.as_str(), |(_, body)| body)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChatMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
