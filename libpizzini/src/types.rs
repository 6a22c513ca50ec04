//! Core types for Pizzini

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier of a pizzini entry
pub type EntryId = i64;

/// One unit of source content to be published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: EntryId,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl ContentEntry {
    pub fn new(
        id: EntryId,
        date: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            date: date.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Parse the source date, written as `dd.mm.yyyy` in the corpus
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%d.%m.%Y").ok()
    }

    /// Shortened content for previews
    ///
    /// Cuts at the last sentence end if it lies beyond 70% of the window,
    /// otherwise hard-cuts. Either way `...` is appended.
    pub fn short_content(&self, max_length: usize) -> String {
        if self.content.chars().count() <= max_length {
            return self.content.clone();
        }

        let truncated: String = self.content.chars().take(max_length).collect();
        let break_point = truncated
            .char_indices()
            .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
            .map(|(i, _)| i)
            .last();

        match break_point {
            Some(idx) if truncated[..idx].chars().count() as f64 > max_length as f64 * 0.7 => {
                format!("{}...", &truncated[..=idx])
            }
            _ => format!("{}...", truncated),
        }
    }

    /// True when the entry carries nothing worth publishing
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

impl std::fmt::Display for ContentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pizzini {}: {} ({})", self.id, self.title, self.date)
    }
}

/// Platform-ready text produced by the formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedPost {
    pub text: String,
    /// Character count of `text`
    pub length: usize,
    pub platform: String,
    pub within_limits: bool,
}

impl FormattedPost {
    pub(crate) fn new(text: String, platform: &str, max_text_length: usize) -> Self {
        let length = text.chars().count();
        Self {
            text,
            length,
            platform: platform.to_string(),
            within_limits: length <= max_text_length,
        }
    }
}
