//! Read-only projection of backend values for list tables.
//!
//! Distinct from the edit-time decode: a list cell is meant for humans, so
//! booleans become pills, markup is stripped, and dates use a readable format.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Marker rendered for empty cells.
pub const EMPTY_MARKER: &str = "\u{2014}";

/// Maximum characters shown for stripped markup before truncation.
pub const EXCERPT_LEN: usize = 50;

/// Icon shown when a thumbnail fails to load.
pub const THUMBNAIL_FALLBACK: &str = "image-placeholder";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static tag pattern compiles"));

/// Colour of a status pill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Danger,
}

/// One rendered list cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DisplayCell {
    /// Coloured "Yes"/"No" pill for booleans.
    Pill { text: &'static str, tone: Tone },
    /// Plain text.
    Text { text: String },
    /// Anchor for URL fields.
    Link { href: String, text: String },
    /// Thumbnail with a placeholder icon for load errors.
    Thumbnail { src: String, fallback: &'static str },
    /// Nothing to show; rendered as an em-dash.
    Empty,
}

impl DisplayCell {
    /// Text cell, or `Empty` for blank input.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text { text }
        }
    }

    /// Yes/No pill.
    #[must_use]
    pub fn pill(flag: bool) -> Self {
        if flag {
            Self::Pill {
                text: "Yes",
                tone: Tone::Success,
            }
        } else {
            Self::Pill {
                text: "No",
                tone: Tone::Danger,
            }
        }
    }

    /// Best plain-text rendering, for terminals and search.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Pill { text, .. } => (*text).to_string(),
            Self::Text { text } => text.clone(),
            Self::Link { text, .. } => text.clone(),
            Self::Thumbnail { src, .. } => src.clone(),
            Self::Empty => EMPTY_MARKER.to_string(),
        }
    }
}

/// Removes markup tags and collapses whitespace.
#[must_use]
pub fn strip_tags(markup: &str) -> String {
    let without_tags = TAG_PATTERN.replace_all(markup, " ");
    without_tags
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncates to `max` characters, appending `...` when anything was cut.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}

/// Markup excerpt for `textarea`/`richtext` cells.
#[must_use]
pub fn excerpt(markup: &str) -> String {
    truncate(&strip_tags(markup), EXCERPT_LEN)
}
