//! Per-type field handlers.
//!
//! Each [`FieldType`] maps to exactly one [`FieldHandler`] that owns the whole
//! capability set for that type: create-mode default, decode from the backend,
//! encode into a multipart payload, widget choice, and list display. Adding a
//! type means adding a variant and its handler arm in [`FieldType::handler`].
//!
//! # Encoding rules
//!
//! - Text-like values are appended only when non-empty; absence means
//!   "unchanged" to the backend.
//! - Booleans always encode as `"1"`/`"0"`.
//! - Collections encode as one JSON array string; an empty selection is omitted.
//! - A removed persisted file emits the tombstone `remove_<name>=1`.

use serde_json::Value;

use crate::display::{excerpt, truncate, DisplayCell, EXCERPT_LEN, THUMBNAIL_FALLBACK};
use crate::field::{FieldDescriptor, FieldType};
use crate::payload::FormPayload;
use crate::preview::storage_url;
use crate::record::Clock;
use crate::temporal::{parse_date, parse_datetime, parse_time};
use crate::value::{bool_flag, json_to_string, json_truthy, FieldValue, FileValue};
use crate::widget::WidgetKind;

/// Format of decoded `date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format of decoded `datetime` values (minute precision).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
/// Format of decoded `time` values.
pub const TIME_FORMAT: &str = "%H:%M";

const DATE_DISPLAY_FORMAT: &str = "%b %-d, %Y";
const DATETIME_DISPLAY_FORMAT: &str = "%b %-d, %Y %H:%M";

/// Prefix of the sibling field that marks a persisted file for deletion.
pub const REMOVE_PREFIX: &str = "remove_";

/// What the encoder knows about a media field beyond its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaState {
    /// The record is being edited rather than created.
    pub editing: bool,
    /// The field held a persisted file when the record was loaded.
    pub had_persisted: bool,
    /// The field still has a preview entry.
    pub has_preview: bool,
}

/// Uniform capability set of one field type.
pub trait FieldHandler: Send + Sync {
    /// Value a fresh create-mode record starts with.
    fn default_value(&self, _clock: &dyn Clock) -> FieldValue {
        FieldValue::empty()
    }

    /// Converts a raw backend value into an editable value.
    fn decode(&self, raw: Option<&Value>) -> FieldValue;

    /// Appends the wire form of `value` under `name`. Never fails.
    fn encode(&self, name: &str, value: &FieldValue, media: MediaState, payload: &mut FormPayload);

    /// Input control for the form.
    fn widget(&self) -> WidgetKind;

    /// Read-only list cell for a raw backend value.
    fn display(&self, field: &FieldDescriptor, raw: Option<&Value>, storage_base_url: &str)
        -> DisplayCell;
}

static TEXT: PlainHandler = PlainHandler::new(WidgetKind::Input { input_type: "text" });
static EMAIL: PlainHandler = PlainHandler::new(WidgetKind::Input { input_type: "email" });
static NUMBER: PlainHandler = PlainHandler::new(WidgetKind::Input { input_type: "number" });
static COLOR: PlainHandler = PlainHandler::new(WidgetKind::Input { input_type: "color" });
static URL: PlainHandler = PlainHandler {
    widget: WidgetKind::Input { input_type: "url" },
    display: PlainDisplay::Link,
};
static TEXTAREA: PlainHandler = PlainHandler {
    widget: WidgetKind::TextArea,
    display: PlainDisplay::Excerpt,
};
static RICHTEXT: PlainHandler = PlainHandler {
    widget: WidgetKind::RichText,
    display: PlainDisplay::Excerpt,
};
static SELECT: PlainHandler = PlainHandler {
    widget: WidgetKind::Select,
    display: PlainDisplay::OptionLabel,
};
static RADIO: PlainHandler = PlainHandler {
    widget: WidgetKind::RadioGroup,
    display: PlainDisplay::OptionLabel,
};
static DATE: TemporalHandler = TemporalHandler(Temporal::Date);
static DATETIME: TemporalHandler = TemporalHandler(Temporal::DateTime);
static TIME: TemporalHandler = TemporalHandler(Temporal::Time);
static BOOLEAN: BooleanHandler = BooleanHandler;
static MULTISELECT: CollectionHandler = CollectionHandler(WidgetKind::MultiSelect);
static CHECKBOX: CollectionHandler = CollectionHandler(WidgetKind::CheckboxGroup);
static JSON: JsonHandler = JsonHandler;
static IMAGE: MediaHandler = MediaHandler { image: true };
static FILE: MediaHandler = MediaHandler { image: false };

impl FieldType {
    /// Handler implementing this type's codec and presentation.
    #[must_use]
    pub fn handler(self) -> &'static dyn FieldHandler {
        match self {
            Self::Text => &TEXT,
            Self::Email => &EMAIL,
            Self::Url => &URL,
            Self::Number => &NUMBER,
            Self::Textarea => &TEXTAREA,
            Self::Richtext => &RICHTEXT,
            Self::Date => &DATE,
            Self::Datetime => &DATETIME,
            Self::Time => &TIME,
            Self::Color => &COLOR,
            Self::Select => &SELECT,
            Self::Multiselect => &MULTISELECT,
            Self::Radio => &RADIO,
            Self::Checkbox => &CHECKBOX,
            Self::Json => &JSON,
            Self::Boolean => &BOOLEAN,
            Self::Image => &IMAGE,
            Self::File => &FILE,
        }
    }
}

fn append_if_present(name: &str, text: String, payload: &mut FormPayload) {
    if !text.is_empty() {
        payload.append_text(name, text);
    }
}

/// Presence in the loose sense used for scalars: `null`, `false`, `0`, and
/// `""` are absent.
fn scalar_present(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn option_label<'a>(field: &'a FieldDescriptor, value: &'a str) -> &'a str {
    field
        .options
        .iter()
        .find(|option| option.value == value)
        .map_or(value, |option| option.label.as_str())
}

// ---------------------------------------------------------------------------
// Plain text-like types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum PlainDisplay {
    Text,
    Link,
    Excerpt,
    OptionLabel,
}

#[derive(Debug, Clone, Copy)]
struct PlainHandler {
    widget: WidgetKind,
    display: PlainDisplay,
}

impl PlainHandler {
    const fn new(widget: WidgetKind) -> Self {
        Self {
            widget,
            display: PlainDisplay::Text,
        }
    }
}

impl FieldHandler for PlainHandler {
    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        FieldValue::Text(raw.map(json_to_string).unwrap_or_default())
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        _media: MediaState,
        payload: &mut FormPayload,
    ) {
        append_if_present(name, value.to_form_string(), payload);
    }

    fn widget(&self) -> WidgetKind {
        self.widget
    }

    fn display(
        &self,
        field: &FieldDescriptor,
        raw: Option<&Value>,
        _storage_base_url: &str,
    ) -> DisplayCell {
        let text = raw.map(json_to_string).unwrap_or_default();
        if text.trim().is_empty() {
            return DisplayCell::Empty;
        }
        match self.display {
            PlainDisplay::Text => DisplayCell::text(text),
            PlainDisplay::Link => DisplayCell::Link {
                href: text.clone(),
                text,
            },
            PlainDisplay::Excerpt => DisplayCell::text(excerpt(&text)),
            PlainDisplay::OptionLabel => DisplayCell::text(option_label(field, &text)),
        }
    }
}

// ---------------------------------------------------------------------------
// Dates and times
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Temporal {
    Date,
    DateTime,
    Time,
}

#[derive(Debug, Clone, Copy)]
struct TemporalHandler(Temporal);

impl TemporalHandler {
    fn reformat(self, raw: &str) -> Option<String> {
        match self.0 {
            Temporal::Date => parse_date(raw).map(|d| d.format(DATE_FORMAT).to_string()),
            Temporal::DateTime => {
                parse_datetime(raw).map(|dt| dt.format(DATETIME_FORMAT).to_string())
            }
            Temporal::Time => parse_time(raw).map(|t| t.format(TIME_FORMAT).to_string()),
        }
    }

    fn humanize(self, raw: &str) -> Option<String> {
        match self.0 {
            Temporal::Date => parse_date(raw).map(|d| d.format(DATE_DISPLAY_FORMAT).to_string()),
            Temporal::DateTime => {
                parse_datetime(raw).map(|dt| dt.format(DATETIME_DISPLAY_FORMAT).to_string())
            }
            Temporal::Time => parse_time(raw).map(|t| t.format(TIME_FORMAT).to_string()),
        }
    }
}

impl FieldHandler for TemporalHandler {
    fn default_value(&self, clock: &dyn Clock) -> FieldValue {
        if self.0 == Temporal::Date {
            FieldValue::Text(clock.today().format(DATE_FORMAT).to_string())
        } else {
            FieldValue::empty()
        }
    }

    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        let text = raw.map(json_to_string).unwrap_or_default();
        if text.is_empty() {
            return FieldValue::empty();
        }
        // Unparseable input is kept so the user can see and fix it.
        FieldValue::Text(self.reformat(&text).unwrap_or(text))
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        _media: MediaState,
        payload: &mut FormPayload,
    ) {
        append_if_present(name, value.to_form_string(), payload);
    }

    fn widget(&self) -> WidgetKind {
        let input_type = match self.0 {
            Temporal::Date => "date",
            Temporal::DateTime => "datetime-local",
            Temporal::Time => "time",
        };
        WidgetKind::Input { input_type }
    }

    fn display(
        &self,
        _field: &FieldDescriptor,
        raw: Option<&Value>,
        _storage_base_url: &str,
    ) -> DisplayCell {
        let text = raw.map(json_to_string).unwrap_or_default();
        if text.is_empty() {
            return DisplayCell::Empty;
        }
        DisplayCell::text(self.humanize(&text).unwrap_or(text))
    }
}

// ---------------------------------------------------------------------------
// Boolean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct BooleanHandler;

impl FieldHandler for BooleanHandler {
    fn default_value(&self, _clock: &dyn Clock) -> FieldValue {
        FieldValue::Bool(false)
    }

    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        FieldValue::Bool(raw.is_some_and(json_truthy))
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        _media: MediaState,
        payload: &mut FormPayload,
    ) {
        let flag = match value {
            FieldValue::Bool(flag) => *flag,
            FieldValue::Text(text) => json_truthy(&Value::String(text.clone())),
            other => !other.is_empty(),
        };
        payload.append_text(name, bool_flag(flag));
    }

    fn widget(&self) -> WidgetKind {
        WidgetKind::Toggle
    }

    fn display(
        &self,
        _field: &FieldDescriptor,
        raw: Option<&Value>,
        _storage_base_url: &str,
    ) -> DisplayCell {
        DisplayCell::pill(raw.is_some_and(json_truthy))
    }
}

// ---------------------------------------------------------------------------
// Multiselect / checkbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct CollectionHandler(WidgetKind);

impl CollectionHandler {
    fn items(raw: Option<&Value>) -> Vec<String> {
        match raw {
            Some(Value::Array(items)) => items.iter().map(json_to_string).collect(),
            // Collections travel as one JSON array string, so read that shape back.
            Some(Value::String(text)) if text.trim_start().starts_with('[') => {
                match serde_json::from_str::<Vec<Value>>(text) {
                    Ok(items) => items.iter().map(json_to_string).collect(),
                    Err(_) => vec![text.clone()],
                }
            }
            Some(scalar) if scalar_present(scalar) => vec![json_to_string(scalar)],
            _ => Vec::new(),
        }
    }
}

impl FieldHandler for CollectionHandler {
    fn default_value(&self, _clock: &dyn Clock) -> FieldValue {
        FieldValue::List(Vec::new())
    }

    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        FieldValue::List(Self::items(raw))
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        _media: MediaState,
        payload: &mut FormPayload,
    ) {
        match value {
            FieldValue::List(items) if !items.is_empty() => {
                append_if_present(name, serde_json::to_string(items).unwrap_or_default(), payload);
            }
            FieldValue::Text(text) => append_if_present(name, text.clone(), payload),
            _ => {}
        }
    }

    fn widget(&self) -> WidgetKind {
        self.0
    }

    fn display(
        &self,
        field: &FieldDescriptor,
        raw: Option<&Value>,
        _storage_base_url: &str,
    ) -> DisplayCell {
        let items = Self::items(raw);
        let labels: Vec<&str> = items
            .iter()
            .map(|value| option_label(field, value))
            .collect();
        DisplayCell::text(labels.join(", "))
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct JsonHandler;

impl FieldHandler for JsonHandler {
    fn default_value(&self, _clock: &dyn Clock) -> FieldValue {
        FieldValue::text("{}")
    }

    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        match raw {
            None | Some(Value::Null) => FieldValue::empty(),
            Some(Value::String(text)) => FieldValue::Text(text.clone()),
            Some(other) => {
                FieldValue::Text(serde_json::to_string_pretty(other).unwrap_or_default())
            }
        }
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        _media: MediaState,
        payload: &mut FormPayload,
    ) {
        // No validation here: malformed JSON goes out verbatim for the backend to reject.
        let text = match value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Bool(flag) => flag.to_string(),
            FieldValue::List(items) if !items.is_empty() => {
                serde_json::to_string(items).unwrap_or_default()
            }
            FieldValue::List(_) | FieldValue::File(_) => String::new(),
        };
        append_if_present(name, text, payload);
    }

    fn widget(&self) -> WidgetKind {
        WidgetKind::JsonEditor
    }

    fn display(
        &self,
        _field: &FieldDescriptor,
        raw: Option<&Value>,
        _storage_base_url: &str,
    ) -> DisplayCell {
        match raw {
            None | Some(Value::Null) => DisplayCell::Empty,
            Some(value) => DisplayCell::text(truncate(&json_to_string(value), EXCERPT_LEN)),
        }
    }
}

// ---------------------------------------------------------------------------
// Image / file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct MediaHandler {
    image: bool,
}

impl FieldHandler for MediaHandler {
    fn default_value(&self, _clock: &dyn Clock) -> FieldValue {
        FieldValue::File(FileValue::Empty)
    }

    fn decode(&self, raw: Option<&Value>) -> FieldValue {
        match raw {
            Some(Value::String(path)) if !path.is_empty() => {
                FieldValue::File(FileValue::PersistedPath(path.clone()))
            }
            _ => FieldValue::File(FileValue::Empty),
        }
    }

    fn encode(
        &self,
        name: &str,
        value: &FieldValue,
        media: MediaState,
        payload: &mut FormPayload,
    ) {
        if let FieldValue::File(FileValue::NewFile(upload)) = value {
            payload.append_file(name, upload.clone());
        } else if media.editing && media.had_persisted && !media.has_preview {
            payload.append_text(format!("{REMOVE_PREFIX}{name}"), "1");
        }
    }

    fn widget(&self) -> WidgetKind {
        if self.image {
            WidgetKind::ImagePicker
        } else {
            WidgetKind::FilePicker
        }
    }

    fn display(
        &self,
        _field: &FieldDescriptor,
        raw: Option<&Value>,
        storage_base_url: &str,
    ) -> DisplayCell {
        let path = match raw {
            Some(Value::String(path)) if !path.is_empty() => path,
            _ => return DisplayCell::Empty,
        };
        let src = storage_url(storage_base_url, path);
        if self.image {
            DisplayCell::Thumbnail {
                src,
                fallback: THUMBNAIL_FALLBACK,
            }
        } else {
            let text = path.rsplit('/').next().unwrap_or(path).to_string();
            DisplayCell::Link { href: src, text }
        }
    }
}
