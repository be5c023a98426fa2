//! Record-level field value codec.
//!
//! Applies the per-type handlers across a whole descriptor list. Both engines
//! go through these two functions, so a record decoded for the form and a row
//! re-encoded by the list's status toggle follow the same rules.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::field::{FieldDescriptor, STATUS_FIELD};
use crate::handler::MediaState;
use crate::payload::FormPayload;
use crate::record::Record;
use crate::value::{bool_flag, json_to_string, json_truthy, FieldValue};

/// Media bookkeeping the encoder needs for tombstones.
#[derive(Debug, Clone, Default)]
pub struct MediaIndex {
    /// Encoding an update of an existing record.
    pub editing: bool,
    /// Fields that held a persisted file when loaded.
    pub persisted: BTreeSet<String>,
    /// Fields that currently have a preview.
    pub previewed: BTreeSet<String>,
}

impl MediaIndex {
    /// Index for create mode: no tombstones can be produced.
    #[must_use]
    pub fn creating() -> Self {
        Self::default()
    }

    fn state(&self, name: &str) -> MediaState {
        MediaState {
            editing: self.editing,
            had_persisted: self.persisted.contains(name),
            has_preview: self.previewed.contains(name),
        }
    }
}

/// Decodes a backend entity into a record.
///
/// Missing `status` defaults to `true`; the id is taken from `id` when present.
#[must_use]
pub fn decode_record(fields: &[FieldDescriptor], raw: &Value) -> Record {
    let mut record = Record::new();
    for field in fields.iter().filter(|f| f.name != STATUS_FIELD) {
        let value = field.field_type.handler().decode(raw.get(&field.name));
        record.set(field.name.clone(), value);
    }
    record.set_status(raw.get(STATUS_FIELD).map_or(true, json_truthy));
    record.set_id(record_id(raw));
    record
}

/// Encodes every declared field of `record`, then `status`.
#[must_use]
pub fn encode_record(
    fields: &[FieldDescriptor],
    record: &Record,
    media: &MediaIndex,
) -> FormPayload {
    let mut payload = FormPayload::new();
    for field in fields.iter().filter(|f| f.name != STATUS_FIELD) {
        let handler = field.field_type.handler();
        let default;
        let value = match record.get(&field.name) {
            Some(value) => value,
            None => {
                default = FieldValue::empty();
                &default
            }
        };
        handler.encode(&field.name, value, media.state(&field.name), &mut payload);
    }
    payload.append_text(STATUS_FIELD, bool_flag(record.status()));
    payload
}

/// Extracts an entity id as a string, accepting numeric and string ids.
#[must_use]
pub fn record_id(raw: &Value) -> Option<String> {
    match raw.get("id") {
        Some(Value::Null) | None => None,
        Some(id) => {
            let id = json_to_string(id);
            (!id.is_empty()).then_some(id)
        }
    }
}

/// Status flag of a backend entity, `true` when absent.
#[must_use]
pub fn raw_status(raw: &Value) -> bool {
    raw.get(STATUS_FIELD).map_or(true, json_truthy)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::field::FieldType;
    use crate::payload::PartValue;
    use crate::value::FileValue;

    fn payload_to_json(payload: &FormPayload) -> Value {
        let mut object = serde_json::Map::new();
        for part in payload.parts() {
            if let PartValue::Text(text) = &part.value {
                object.insert(part.name.clone(), Value::String(text.clone()));
            }
        }
        Value::Object(object)
    }

    #[test]
    fn decode_reads_id_and_status() {
        let fields = vec![FieldDescriptor::new("title", "Title", FieldType::Text)];
        let record = decode_record(&fields, &json!({"id": 7, "title": "Hi", "status": 0}));
        assert_eq!(record.id(), Some("7"));
        assert!(!record.status());
        assert_eq!(record.get("title"), Some(&FieldValue::text("Hi")));
    }

    #[test]
    fn missing_status_defaults_to_active() {
        let record = decode_record(&[], &json!({"id": "a"}));
        assert!(record.status());
    }

    #[test]
    fn status_is_always_encoded() {
        let mut record = Record::new();
        let payload = encode_record(&[], &record, &MediaIndex::creating());
        assert_eq!(payload.text("status"), Some("1"));

        record.set_status(false);
        let payload = encode_record(&[], &record, &MediaIndex::creating());
        assert_eq!(payload.text("status"), Some("0"));
    }

    #[test]
    fn unset_fields_are_omitted() {
        let fields = vec![FieldDescriptor::new("subtitle", "Subtitle", FieldType::Text)];
        let payload = encode_record(&fields, &Record::new(), &MediaIndex::creating());
        assert_eq!(payload.names(), vec!["status"]);
    }

    #[test]
    fn json_field_round_trips_to_equal_value() {
        let fields = vec![FieldDescriptor::new("meta", "Meta", FieldType::Json)];
        let record = decode_record(&fields, &json!({"meta": {"a": 1}}));
        let payload = encode_record(&fields, &record, &MediaIndex::creating());
        let sent: Value = serde_json::from_str(payload.text("meta").unwrap()).unwrap();
        assert_eq!(sent, json!({"a": 1}));
    }

    #[test]
    fn create_mode_never_emits_tombstones() {
        let fields = vec![FieldDescriptor::new("cover", "Cover", FieldType::Image)];
        let mut record = Record::new();
        record.set("cover", FieldValue::File(FileValue::Empty));
        let payload = encode_record(&fields, &record, &MediaIndex::creating());
        assert!(!payload.contains("remove_cover"));
    }

    #[test]
    fn typed_values_survive_encode_then_decode() {
        let fields = vec![
            FieldDescriptor::new("day", "Day", FieldType::Date),
            FieldDescriptor::new("starts", "Starts", FieldType::Datetime),
            FieldDescriptor::new("opens", "Opens", FieldType::Time),
            FieldDescriptor::new("on", "On", FieldType::Boolean),
            FieldDescriptor::new("off", "Off", FieldType::Boolean),
            FieldDescriptor::new("meta", "Meta", FieldType::Json),
        ];
        let stored = json!({
            "day": "2024-05-01",
            "starts": "2024-05-01T10:30",
            "opens": "10:30",
            "on": 1,
            "off": 0,
            "meta": {"a": 1},
        });

        let first = decode_record(&fields, &stored);
        let payload = encode_record(&fields, &first, &MediaIndex::creating());
        let second = decode_record(&fields, &payload_to_json(&payload));

        assert_eq!(payload.text("day"), Some("2024-05-01"));
        assert_eq!(payload.text("starts"), Some("2024-05-01T10:30"));
        assert_eq!(payload.text("opens"), Some("10:30"));
        assert_eq!(payload.text("on"), Some("1"));
        assert_eq!(payload.text("off"), Some("0"));
        for field in &fields {
            assert_eq!(second.get(&field.name), first.get(&field.name), "{}", field.name);
        }
        assert_eq!(second.get("on"), Some(&FieldValue::Bool(true)));
        assert_eq!(second.get("off"), Some(&FieldValue::Bool(false)));
    }

    fn scalar_type() -> impl Strategy<Value = FieldType> {
        prop_oneof![
            Just(FieldType::Text),
            Just(FieldType::Email),
            Just(FieldType::Url),
            Just(FieldType::Number),
            Just(FieldType::Textarea),
            Just(FieldType::Richtext),
            Just(FieldType::Color),
            Just(FieldType::Select),
            Just(FieldType::Radio),
        ]
    }

    proptest! {
        #[test]
        fn scalar_values_survive_encode_then_decode(
            ty in scalar_type(),
            text in "[a-zA-Z0-9 <>/.:@#-]{0,40}",
        ) {
            let fields = vec![FieldDescriptor::new("f", "F", ty)];
            let mut record = Record::new();
            record.set("f", FieldValue::Text(text.clone()));
            let payload = encode_record(&fields, &record, &MediaIndex::creating());
            let decoded = decode_record(&fields, &payload_to_json(&payload));
            prop_assert_eq!(decoded.get("f"), Some(&FieldValue::Text(text)));
        }

        #[test]
        fn booleans_encode_as_one_or_zero(flag in any::<bool>(), as_text in any::<bool>()) {
            let fields = vec![FieldDescriptor::new("f", "F", FieldType::Boolean)];
            let mut record = Record::new();
            let value = if as_text {
                FieldValue::text(if flag { "true" } else { "false" })
            } else {
                FieldValue::Bool(flag)
            };
            record.set("f", value);
            let payload = encode_record(&fields, &record, &MediaIndex::creating());
            let sent = payload.text("f").unwrap();
            prop_assert!(sent == "1" || sent == "0");
            prop_assert_eq!(sent == "1", flag);
        }

        #[test]
        fn selections_survive_encode_then_decode(
            items in proptest::collection::vec("[a-z0-9]{1,8}", 0..6),
            checkbox in any::<bool>(),
        ) {
            let ty = if checkbox { FieldType::Checkbox } else { FieldType::Multiselect };
            let fields = vec![FieldDescriptor::new("f", "F", ty)];
            let mut record = Record::new();
            record.set("f", FieldValue::List(items.clone()));
            let payload = encode_record(&fields, &record, &MediaIndex::creating());
            if items.is_empty() {
                prop_assert!(!payload.contains("f"));
            }
            let decoded = decode_record(&fields, &payload_to_json(&payload));
            prop_assert_eq!(decoded.get("f"), Some(&FieldValue::List(items)));
        }
    }
}
