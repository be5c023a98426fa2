//! CMS Admin Core: field types, value codec, and the dynamic form and list engines.
//!
//! Everything here is I/O free: backend access, notifications, object URLs,
//! and the clock are injected through traits so the engines run the same in
//! a terminal, a test, or a UI shell.

pub mod codec;
pub mod context;
pub mod crop;
pub mod display;
pub mod error;
pub mod field;
pub mod form;
pub mod gallery;
pub mod handler;
pub mod list;
pub mod module;
pub mod navigation;
pub mod notify;
pub mod payload;
pub mod preview;
pub mod record;
pub mod registry;
pub mod temporal;
pub mod traits;
pub mod value;
pub mod widget;

#[cfg(test)]
mod testing;

pub use codec::{decode_record, encode_record, record_id, MediaIndex};
pub use context::EngineContext;
pub use display::DisplayCell;
pub use error::{ApiError, FormError, ListError, ModuleError};
pub use field::{DescriptorError, FieldDescriptor, FieldOption, FieldType};
pub use form::{FormEngine, FormMode, FormState, SubmitOutcome};
pub use gallery::{GalleryEditor, RecordLayout};
pub use list::{BulkDeleteReport, ListEngine, ListRow};
pub use module::{mount_module, resolve, ModuleAction, ModuleDefinition, ModuleView};
pub use navigation::Route;
pub use notify::{Notification, NotificationLog, Notifier, Severity};
pub use payload::{FormPart, FormPayload, PartValue};
pub use preview::{BlobUrlRegistry, DataUrlFactory, ObjectUrl, ObjectUrlFactory};
pub use record::{Clock, FixedClock, Record, SystemClock};
pub use traits::{ClientFactory, EntityClient, ModuleRegistry};
pub use value::{FieldValue, FileUpload, FileValue};
pub use widget::{Widget, WidgetKind};
