//! Dynamic form engine.
//!
//! Drives one create/edit form from a descriptor list.
//!
//! State machine: `Loading` (edit mode, while fetching) -> `Ready` ->
//! `Submitting` -> `Ready`. A submission that succeeds hands back a [`Route`]
//! or reloads in place; one that fails leaves the user's edits untouched.
//!
//! The engine exclusively owns its [`Record`] and [`PreviewTable`]. Dropping
//! the engine drops every preview lease, which revokes any object URLs it
//! created.
//!
//! A [`RecordLayout::Gallery`] form also owns a [`GalleryEditor`] for the
//! nested item tree, rebuilt on every load and sent with every submit.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{decode_record, encode_record, record_id, MediaIndex};
use crate::context::EngineContext;
use crate::error::FormError;
use crate::field::{validate_descriptors, FieldDescriptor, FieldType};
use crate::gallery::{GalleryEditor, RecordLayout};
use crate::navigation::Route;
use crate::notify::Notification;
use crate::preview::{storage_url, FilePreview, ObjectUrl, PreviewSource, PreviewTable};
use crate::record::Record;
use crate::traits::EntityClient;
use crate::value::{FieldValue, FileUpload, FileValue};
use crate::widget::Widget;

const SAVE_FAILED: &str = "Something went wrong while saving. Please try again.";
const LOAD_FAILED: &str = "Failed to load the record.";

/// Whether the form creates a new entity or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

/// Lifecycle state of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Ready,
    Submitting,
}

/// What happened after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Leave the form for this route.
    Navigate(Route),
    /// Stayed on the edit form and re-fetched the server's canonical record.
    Reloaded,
}

/// One mounted create/edit form.
pub struct FormEngine {
    fields: Vec<FieldDescriptor>,
    client: Arc<dyn EntityClient>,
    ctx: EngineContext,
    mode: FormMode,
    state: FormState,
    record: Record,
    previews: PreviewTable,
    /// Media fields that held a persisted file when the record was loaded.
    persisted: BTreeSet<String>,
    gallery: Option<GalleryEditor>,
}

impl FormEngine {
    /// Builds the engine without touching the network.
    ///
    /// Create mode starts `Ready` with type defaults applied. Edit mode starts
    /// `Loading`; call [`FormEngine::load`] to fetch the record.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Descriptor`] if the descriptor list is invalid.
    pub fn new(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
        mode: FormMode,
    ) -> Result<Self, FormError> {
        validate_descriptors(&fields)?;
        let (state, record) = match &mode {
            FormMode::Create => (
                FormState::Ready,
                Record::with_defaults(&fields, ctx.clock.as_ref()),
            ),
            FormMode::Edit { .. } => (FormState::Loading, Record::new()),
        };
        Ok(Self {
            fields,
            client,
            ctx,
            mode,
            state,
            record,
            previews: PreviewTable::new(),
            persisted: BTreeSet::new(),
            gallery: None,
        })
    }

    /// Attaches the nested tree editor a gallery module needs.
    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.gallery = match layout {
            RecordLayout::Flat => None,
            RecordLayout::Gallery => Some(GalleryEditor::new(self.ctx.object_urls.clone())),
        };
        self
    }

    /// Builds the engine and, in edit mode, loads the record.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Descriptor`] for invalid descriptors and
    /// [`FormError::Load`] (after notifying) when the record cannot be fetched.
    pub async fn mount(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
        mode: FormMode,
    ) -> Result<Self, FormError> {
        Self::mount_with_layout(ctx, client, fields, mode, RecordLayout::Flat).await
    }

    /// [`FormEngine::mount`] for a module whose entities carry `layout`.
    ///
    /// # Errors
    ///
    /// See [`FormEngine::mount`].
    pub async fn mount_with_layout(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
        mode: FormMode,
        layout: RecordLayout,
    ) -> Result<Self, FormError> {
        let mut engine = Self::new(ctx, client, fields, mode)?.with_layout(layout);
        if matches!(engine.mode, FormMode::Edit { .. }) {
            engine.load().await?;
        }
        Ok(engine)
    }

    /// Fetches the edited record, decodes it, and rebuilds the previews.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Load`] with the list route to navigate to.
    pub async fn load(&mut self) -> Result<(), FormError> {
        let FormMode::Edit { id } = &self.mode else {
            return Ok(());
        };
        let id = id.clone();
        self.state = FormState::Loading;
        debug!(resource = self.client.resource(), id = %id, "loading record");

        match self.client.get_item(&id).await {
            Ok(raw) => {
                self.apply_loaded(&raw);
                self.state = FormState::Ready;
                Ok(())
            }
            Err(source) => {
                warn!(
                    resource = self.client.resource(),
                    id = %id,
                    error = %source,
                    "record load failed"
                );
                self.ctx
                    .notifier
                    .notify(Notification::error(source.user_message(LOAD_FAILED)));
                Err(FormError::Load {
                    redirect: self.list_route(),
                    source,
                })
            }
        }
    }

    fn apply_loaded(&mut self, raw: &Value) {
        self.record = decode_record(&self.fields, raw);
        if self.gallery.is_some() {
            self.gallery = Some(GalleryEditor::from_raw(self.ctx.object_urls.clone(), raw));
        }
        self.previews.clear();
        self.persisted.clear();
        for field in self.fields.iter().filter(|f| f.field_type.is_media()) {
            let Some(FieldValue::File(FileValue::PersistedPath(path))) =
                self.record.get(&field.name)
            else {
                continue;
            };
            self.persisted.insert(field.name.clone());
            self.previews.insert(
                field.name.clone(),
                FilePreview {
                    source: PreviewSource::Stored(storage_url(&self.ctx.storage_base_url, path)),
                    original_path: Some(path.clone()),
                },
            );
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> FormState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Nested tree of a gallery module, `None` for flat modules.
    #[must_use]
    pub fn gallery(&self) -> Option<&GalleryEditor> {
        self.gallery.as_ref()
    }

    pub fn gallery_mut(&mut self) -> Option<&mut GalleryEditor> {
        self.gallery.as_mut()
    }

    #[must_use]
    pub fn previews(&self) -> &PreviewTable {
        &self.previews
    }

    /// Preview URL or label for a media field.
    #[must_use]
    pub fn preview(&self, name: &str) -> Option<&str> {
        self.previews.get(name).map(|preview| preview.source.src())
    }

    /// Live JSON parse feedback for a `json` field, `None` when it parses.
    #[must_use]
    pub fn json_feedback(&self, name: &str) -> Option<String> {
        let field = self.field(name)?;
        if field.field_type != FieldType::Json {
            return None;
        }
        let text = self.record.get(name)?.as_text()?;
        if text.trim().is_empty() {
            return None;
        }
        serde_json::from_str::<Value>(text)
            .err()
            .map(|err| err.to_string())
    }

    /// Renderable description of every field.
    #[must_use]
    pub fn widgets(&self) -> Vec<Widget> {
        self.fields
            .iter()
            .map(|field| {
                let value = self.record.get(&field.name).cloned().unwrap_or_else(|| {
                    field
                        .field_type
                        .handler()
                        .default_value(self.ctx.clock.as_ref())
                });
                let mut widget = Widget::for_field(field, value);
                widget.preview = self.preview(&field.name).map(str::to_string);
                widget.feedback = self.json_feedback(&field.name);
                widget
            })
            .collect()
    }

    fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn list_route(&self) -> Route {
        Route::List {
            resource: self.client.resource().to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Replaces a field's value. No validation.
    pub fn set_field(&mut self, name: &str, value: FieldValue) {
        self.record.set(name, value);
    }

    /// Sets the implicit status flag.
    pub fn set_status(&mut self, status: bool) {
        self.record.set_status(status);
    }

    /// Stores a newly chosen file and builds its preview.
    ///
    /// Image fields get an object-URL lease; any previous lease for the field
    /// is released. File fields are labelled by file name.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownField`] or [`FormError::NotAFileField`].
    pub fn choose_file(&mut self, name: &str, upload: FileUpload) -> Result<(), FormError> {
        let field_type = self
            .field(name)
            .ok_or_else(|| FormError::UnknownField { name: name.to_string() })?
            .field_type;
        let source = match field_type {
            FieldType::Image => {
                PreviewSource::Upload(ObjectUrl::acquire(&self.ctx.object_urls, &upload))
            }
            FieldType::File => PreviewSource::FileName(upload.file_name.clone()),
            _ => return Err(FormError::NotAFileField { name: name.to_string() }),
        };
        let original_path = self.previews.original_path(name).map(str::to_string);
        self.previews.insert(
            name,
            FilePreview {
                source,
                original_path,
            },
        );
        debug!(field = name, file = %upload.file_name, "file chosen");
        self.record.set(name, FieldValue::from(upload));
        Ok(())
    }

    /// Clears a media field and its preview so the encoder emits the removal tombstone.
    pub fn remove_file(&mut self, name: &str) {
        self.previews.remove(name);
        self.record.set(name, FieldValue::File(FileValue::Empty));
        debug!(field = name, "file removed");
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Names of required fields whose value is falsy.
    ///
    /// Falsy: empty text, a numeric zero in a `number` field, `false`, an
    /// empty selection, or a media field with neither a new file nor a preview.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&FieldDescriptor> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .filter(|field| self.is_falsy(field))
            .collect()
    }

    fn is_falsy(&self, field: &FieldDescriptor) -> bool {
        let Some(value) = self.record.get(&field.name) else {
            return true;
        };
        match value {
            FieldValue::Text(text) => {
                text.is_empty()
                    || (field.field_type == FieldType::Number
                        && text.trim().parse::<f64>().is_ok_and(|n| n == 0.0))
            }
            FieldValue::Bool(flag) => !flag,
            FieldValue::List(items) => items.is_empty(),
            FieldValue::File(FileValue::NewFile(_)) => false,
            FieldValue::File(_) => !self.previews.contains(&field.name),
        }
    }

    /// Encodes the current record exactly as `submit` would send it.
    #[must_use]
    pub fn payload(&self) -> crate::payload::FormPayload {
        let media = MediaIndex {
            editing: matches!(self.mode, FormMode::Edit { .. }),
            persisted: self.persisted.clone(),
            previewed: self
                .fields
                .iter()
                .filter(|field| self.previews.contains(&field.name))
                .map(|field| field.name.clone())
                .collect(),
        };
        let mut payload = encode_record(&self.fields, &self.record, &media);
        if let Some(gallery) = &self.gallery {
            gallery.encode_tree(&mut payload);
        }
        payload
    }

    /// Validates, encodes, and sends the record.
    ///
    /// With `continue_editing` a create navigates to the new record's edit
    /// route and an edit reloads in place; otherwise the list route is returned.
    ///
    /// # Errors
    ///
    /// - [`FormError::Busy`] when not `Ready`.
    /// - [`FormError::Validation`] when required fields are missing; nothing is sent.
    /// - [`FormError::Api`] when the backend rejects the write; edits are kept.
    pub async fn submit(&mut self, continue_editing: bool) -> Result<SubmitOutcome, FormError> {
        if self.state != FormState::Ready {
            return Err(FormError::Busy);
        }

        let missing = self.missing_required();
        if !missing.is_empty() {
            for field in &missing {
                self.ctx.notifier.notify(Notification::error(format!(
                    "{} is required",
                    field.display_label()
                )));
            }
            let fields = missing.iter().map(|field| field.name.clone()).collect();
            return Err(FormError::Validation { fields });
        }

        self.state = FormState::Submitting;
        let payload = self.payload();
        let result = match &self.mode {
            FormMode::Create => self.client.create_item(payload).await,
            FormMode::Edit { id } => self.client.update_item(id, payload).await,
        };
        self.state = FormState::Ready;

        match result {
            Ok(saved) => {
                info!(resource = self.client.resource(), mode = ?self.mode, "record saved");
                self.ctx.notifier.notify(Notification::success(match self.mode {
                    FormMode::Create => "Created successfully",
                    FormMode::Edit { .. } => "Updated successfully",
                }));
                self.after_save(continue_editing, &saved).await
            }
            Err(err) => {
                warn!(resource = self.client.resource(), error = %err, "save failed");
                self.ctx
                    .notifier
                    .notify(Notification::error(err.user_message(SAVE_FAILED)));
                Err(FormError::Api(err))
            }
        }
    }

    async fn after_save(
        &mut self,
        continue_editing: bool,
        saved: &Value,
    ) -> Result<SubmitOutcome, FormError> {
        if !continue_editing {
            return Ok(SubmitOutcome::Navigate(self.list_route()));
        }
        match &self.mode {
            FormMode::Create => Ok(SubmitOutcome::Navigate(match record_id(saved) {
                Some(id) => Route::Edit {
                    resource: self.client.resource().to_string(),
                    id,
                },
                None => self.list_route(),
            })),
            FormMode::Edit { .. } => {
                self.load().await?;
                Ok(SubmitOutcome::Reloaded)
            }
        }
    }
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("resource", &self.client.resource())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
