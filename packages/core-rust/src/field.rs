//! Field descriptors: the declarative metadata for one editable entity attribute.
//!
//! Descriptor lists drive every engine in this crate. They arrive either from
//! the built-in entity catalog or from the backend module registry, so they are
//! `serde`-deserializable and forgiving about shape: unknown type tags collapse
//! to [`FieldType::Text`] and options may be `{value, label}` objects or bare
//! scalars.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::json_to_string;

/// Prefixes reserved for sibling multipart fields emitted by the codec.
pub const RESERVED_PREFIXES: [&str; 2] = ["remove_", "existing_"];

/// Body field used for the HTTP verb override on updates.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Name of the implicit status field present on every record.
///
/// A descriptor with this name is tolerated but the codec treats status
/// through the record's own flag, never through the descriptor.
pub const STATUS_FIELD: &str = "status";

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// Closed enumeration of supported field types.
///
/// Governs widget choice, codec behavior, and list display. Deserializing an
/// unrecognised tag yields [`FieldType::Text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FieldType {
    Text,
    Email,
    Url,
    Number,
    Textarea,
    Richtext,
    Date,
    Datetime,
    Time,
    Color,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Json,
    Boolean,
    Image,
    File,
}

impl FieldType {
    /// Every variant, in declaration order.
    pub const ALL: [FieldType; 18] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Url,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Richtext,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Time,
        FieldType::Color,
        FieldType::Select,
        FieldType::Multiselect,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Json,
        FieldType::Boolean,
        FieldType::Image,
        FieldType::File,
    ];

    /// Parses a type tag case-insensitively, falling back to `Text`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == tag)
            .unwrap_or(FieldType::Text)
    }

    /// Wire tag for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Url => "url",
            Self::Number => "number",
            Self::Textarea => "textarea",
            Self::Richtext => "richtext",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Color => "color",
            Self::Select => "select",
            Self::Multiselect => "multiselect",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Json => "json",
            Self::Boolean => "boolean",
            Self::Image => "image",
            Self::File => "file",
        }
    }

    /// Whether the type is edited as an ordered sequence of option values.
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Multiselect | Self::Checkbox)
    }

    /// Whether the type carries an uploaded file.
    #[must_use]
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::File)
    }

    /// Whether the type is chosen from a declared option list.
    #[must_use]
    pub fn has_options(self) -> bool {
        matches!(
            self,
            Self::Select | Self::Multiselect | Self::Radio | Self::Checkbox
        )
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldOption
// ---------------------------------------------------------------------------

/// One choice of a `select`/`multiselect`/`radio`/`checkbox` field.
///
/// Bare scalars in the source list become options whose label equals the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Pair {
        value: serde_json::Value,
        #[serde(default)]
        label: Option<String>,
    },
    Scalar(serde_json::Value),
}

impl From<RawOption> for FieldOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Pair { value, label } => {
                let value = json_to_string(&value);
                let label = label.unwrap_or_else(|| value.clone());
                Self { value, label }
            }
            RawOption::Scalar(value) => {
                let value = json_to_string(&value);
                Self {
                    label: value.clone(),
                    value,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// Declares one editable attribute of a dynamic entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Record key and multipart field name.
    pub name: String,
    /// Human-readable display text. Defaults to `name` when absent.
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

fn default_type() -> FieldType {
    FieldType::Text
}

impl FieldDescriptor {
    /// Creates an optional field with no options.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            options: Vec::new(),
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attaches option choices.
    #[must_use]
    pub fn with_options<I, V, L>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(value, label)| FieldOption::new(value, label))
            .collect();
        self
    }

    /// Label to show, falling back to the field name.
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Checks the name against the form-identifier rules.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] when the name is empty, contains
    /// characters outside `[A-Za-z0-9_-[]]`, or collides with a reserved name.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        if let Some(ch) = self
            .name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '[' | ']')))
        {
            return Err(DescriptorError::InvalidCharacter {
                name: self.name.clone(),
                ch,
            });
        }
        if self.name == METHOD_OVERRIDE_FIELD {
            return Err(DescriptorError::Reserved {
                name: self.name.clone(),
            });
        }
        if RESERVED_PREFIXES
            .iter()
            .any(|prefix| self.name.starts_with(prefix))
        {
            return Err(DescriptorError::Reserved {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Validates a whole descriptor list: every name valid and unique.
///
/// # Errors
///
/// Returns the first [`DescriptorError`] encountered.
pub fn validate_descriptors(fields: &[FieldDescriptor]) -> Result<(), DescriptorError> {
    let mut seen = BTreeSet::new();
    for field in fields {
        field.validate()?;
        if !seen.insert(field.name.as_str()) {
            return Err(DescriptorError::Duplicate {
                name: field.name.clone(),
            });
        }
    }
    Ok(())
}

/// Errors from validating field descriptors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("field name must not be empty")]
    EmptyName,
    #[error("field name {name:?} contains invalid character {ch:?}")]
    InvalidCharacter { name: String, ch: char },
    #[error("field name {name:?} collides with a reserved form field")]
    Reserved { name: String },
    #[error("field name {name:?} is declared more than once")]
    Duplicate { name: String },
}
