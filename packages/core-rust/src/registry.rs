//! Static rendering metadata per field type.

use crate::field::FieldType;

/// Rendering hints for one field type.
#[derive(Debug, Clone, Copy)]
pub struct FieldTypeConfig {
    /// CSS class hint for the input widget.
    pub css_hint: &'static str,
    /// Row count for multi-line editors.
    pub rows: Option<u16>,
    placeholder: fn(&str) -> String,
}

impl FieldTypeConfig {
    /// Placeholder text for a field with the given label.
    #[must_use]
    pub fn placeholder(&self, label: &str) -> String {
        (self.placeholder)(label)
    }
}

const TEXT: FieldTypeConfig = FieldTypeConfig {
    css_hint: "form-control",
    rows: None,
    placeholder: |label| format!("Enter {}", label.to_lowercase()),
};

/// Looks up the configuration for a field type.
///
/// Tags that do not name a known type were already mapped to `Text` when the
/// descriptor was parsed, so this lookup is total.
#[must_use]
pub fn config(field_type: FieldType) -> FieldTypeConfig {
    match field_type {
        FieldType::Text => TEXT,
        FieldType::Number => FieldTypeConfig {
            placeholder: |label| format!("Enter {} (number)", label.to_lowercase()),
            ..TEXT
        },
        FieldType::Email => FieldTypeConfig {
            placeholder: |_| "name@example.com".to_string(),
            ..TEXT
        },
        FieldType::Url => FieldTypeConfig {
            placeholder: |_| "https://example.com".to_string(),
            ..TEXT
        },
        FieldType::Textarea => FieldTypeConfig {
            css_hint: "form-control form-textarea",
            rows: Some(4),
            placeholder: |label| format!("Enter {}...", label.to_lowercase()),
        },
        FieldType::Richtext => FieldTypeConfig {
            css_hint: "form-control form-richtext",
            rows: Some(8),
            placeholder: |label| format!("Write {}...", label.to_lowercase()),
        },
        FieldType::Json => FieldTypeConfig {
            css_hint: "form-control font-monospace",
            rows: Some(6),
            placeholder: |_| r#"{"key": "value"}"#.to_string(),
        },
        FieldType::Date => FieldTypeConfig {
            placeholder: |_| "YYYY-MM-DD".to_string(),
            ..TEXT
        },
        FieldType::Datetime => FieldTypeConfig {
            placeholder: |_| "YYYY-MM-DDTHH:MM".to_string(),
            ..TEXT
        },
        FieldType::Time => FieldTypeConfig {
            placeholder: |_| "HH:MM".to_string(),
            ..TEXT
        },
        FieldType::Color => FieldTypeConfig {
            css_hint: "form-control form-control-color",
            rows: None,
            placeholder: |_| "#000000".to_string(),
        },
        FieldType::Select | FieldType::Multiselect => FieldTypeConfig {
            css_hint: "form-select",
            rows: None,
            placeholder: |label| format!("Select {}", label.to_lowercase()),
        },
        FieldType::Radio | FieldType::Checkbox | FieldType::Boolean => FieldTypeConfig {
            css_hint: "form-check-input",
            rows: None,
            placeholder: |_| String::new(),
        },
        FieldType::Image | FieldType::File => FieldTypeConfig {
            css_hint: "form-control form-file",
            rows: None,
            placeholder: |label| format!("Choose {}", label.to_lowercase()),
        },
    }
}
