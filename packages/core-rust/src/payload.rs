//! Ordered multipart payload produced by the encoder.
//!
//! The payload is transport-neutral: the HTTP client turns it into a real
//! `multipart/form-data` body, while tests inspect it directly.

use crate::value::FileUpload;

/// Value of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File(FileUpload),
}

/// One named multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// Ordered list of multipart parts. Names may repeat (`images[]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text part.
    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::Text(value.into()),
        });
    }

    /// Appends a file part.
    pub fn append_file(&mut self, name: impl Into<String>, upload: FileUpload) {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::File(upload),
        });
    }

    /// First text value stored under `name`.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match &part.value {
            PartValue::Text(text) if part.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    /// All text values stored under `name`, in order.
    #[must_use]
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|part| part.name == name)
            .filter_map(|part| match &part.value {
                PartValue::Text(text) => Some(text.as_str()),
                PartValue::File(_) => None,
            })
            .collect()
    }

    /// First file stored under `name`.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileUpload> {
        self.parts.iter().find_map(|part| match &part.value {
            PartValue::File(upload) if part.name == name => Some(upload),
            _ => None,
        })
    }

    /// Whether any part is named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.name == name)
    }

    /// Part names in order, duplicates included.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|part| part.name.as_str()).collect()
    }

    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    #[must_use]
    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
