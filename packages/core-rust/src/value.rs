//! Editable in-memory field values.
//!
//! [`FieldValue`] is the closed set of shapes a form field can hold while it is
//! being edited. File fields carry an explicit [`FileValue`] tag recording
//! whether the value is a fresh upload or a path that already lives on the
//! backend, so nothing downstream has to guess from the payload.

use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Editable value of one record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    /// Scalar text, including dates, numbers, colors, and JSON source.
    Text(String),
    /// Strict boolean.
    Bool(bool),
    /// Ordered selection for `multiselect`/`checkbox` fields.
    List(Vec<String>),
    /// Image or file field.
    File(FileValue),
}

impl FieldValue {
    /// Empty text value.
    #[must_use]
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Convenience constructor for text values.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the text when this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the selection when this is a `List` value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the file value when this is a `File` value.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileValue> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Whether the value is "empty" for payload purposes.
    ///
    /// Empty text, an empty selection, and an empty file slot are empty.
    /// `Bool(false)` is a value, not an absence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Bool(_) => false,
            Self::List(items) => items.is_empty(),
            Self::File(file) => matches!(file, FileValue::Empty),
        }
    }

    /// Scalar string form used when a value lands in a text multipart part.
    #[must_use]
    pub fn to_form_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bool(flag) => bool_flag(*flag).to_string(),
            Self::List(items) => serde_json::to_string(items).unwrap_or_default(),
            Self::File(FileValue::PersistedPath(path)) => path.clone(),
            Self::File(FileValue::NewFile(upload)) => upload.file_name.clone(),
            Self::File(FileValue::Empty) => String::new(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<FileUpload> for FieldValue {
    fn from(upload: FileUpload) -> Self {
        Self::File(FileValue::NewFile(upload))
    }
}

/// State of an image/file field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum FileValue {
    /// A file the user just picked, not yet uploaded.
    NewFile(FileUpload),
    /// Backend-relative path of an already stored file.
    PersistedPath(String),
    /// No file.
    #[default]
    Empty,
}

/// Bytes of a locally chosen file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl FileUpload {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Renders the file as an inline `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        let content_type = if self.content_type.is_empty() {
            "application/octet-stream"
        } else {
            &self.content_type
        };
        format!(
            "data:{content_type};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Multipart flag for a boolean: `"1"` or `"0"`.
#[must_use]
pub fn bool_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// String form of a raw backend value.
///
/// `null` becomes the empty string, strings are kept verbatim, and every other
/// value uses its compact JSON text.
#[must_use]
pub fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Truthiness of a raw backend value.
///
/// `"0"`, `"false"`, and the empty string are false even though they are
/// non-empty strings, because backends send flags in all of these shapes.
#[must_use]
pub fn json_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(text) => {
            !matches!(text.trim().to_ascii_lowercase().as_str(), "" | "0" | "false")
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}
