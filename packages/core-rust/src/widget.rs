//! Renderable widget descriptions produced by the form engine.
//!
//! The engine never draws anything itself. A front end walks the [`Widget`]
//! list and renders each entry with whatever toolkit it uses.

use serde::Serialize;

use crate::field::{FieldDescriptor, FieldOption};
use crate::registry;
use crate::value::FieldValue;

/// Input control to render for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WidgetKind {
    /// Single-line `<input>` of the given HTML type.
    Input { input_type: &'static str },
    TextArea,
    RichText,
    Select,
    MultiSelect,
    RadioGroup,
    CheckboxGroup,
    Toggle,
    JsonEditor,
    ImagePicker,
    FilePicker,
}

/// Everything a front end needs to render one field.
#[derive(Debug, Clone, Serialize)]
pub struct Widget {
    pub name: String,
    pub label: String,
    pub kind: WidgetKind,
    pub required: bool,
    pub placeholder: String,
    pub css_hint: &'static str,
    pub rows: Option<u16>,
    pub options: Vec<FieldOption>,
    pub value: FieldValue,
    /// Preview URL or file label for image/file fields.
    pub preview: Option<String>,
    /// Live parse error for JSON fields.
    pub feedback: Option<String>,
}

impl Widget {
    /// Builds the widget for `field` holding `value`.
    #[must_use]
    pub fn for_field(field: &FieldDescriptor, value: FieldValue) -> Self {
        let config = registry::config(field.field_type);
        let label = field.display_label().to_string();
        Self {
            name: field.name.clone(),
            kind: field.field_type.handler().widget(),
            required: field.required,
            placeholder: config.placeholder(&label),
            css_hint: config.css_hint,
            rows: config.rows,
            options: field.options.clone(),
            value,
            preview: None,
            feedback: None,
            label,
        }
    }
}
