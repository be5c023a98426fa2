//! The in-memory record being created or edited.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::field::{FieldDescriptor, STATUS_FIELD};
use crate::value::FieldValue;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "today" for date defaults.
///
/// Injected so that create-mode defaults are deterministic under test.
pub trait Clock: Send + Sync {
    /// Current local calendar date.
    fn today(&self) -> NaiveDate;
}

/// Clock reading the local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Field values of one entity plus its implicit `status` and optional `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
    status: bool,
    id: Option<String>,
}

impl Record {
    /// Empty record with `status = true` and no id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            status: true,
            id: None,
        }
    }

    /// Create-mode record: every declared field at its type default.
    #[must_use]
    pub fn with_defaults(fields: &[FieldDescriptor], clock: &dyn Clock) -> Self {
        let mut record = Self::new();
        for field in fields.iter().filter(|f| f.name != STATUS_FIELD) {
            let value = field.field_type.handler().default_value(clock);
            record.values.insert(field.name.clone(), value);
        }
        record
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Replaces a field's value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(name.into(), value)
    }

    #[must_use]
    pub fn status(&self) -> bool {
        self.status
    }

    pub fn set_status(&mut self, status: bool) {
        self.status = status;
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
