//! Dynamic list engine.
//!
//! Holds the full collection fetched from the backend and derives everything
//! else client-side: search filter, fixed-size pages, page-scoped selection,
//! and display cells. Writes (status toggle, delete, bulk delete) always end
//! with a refetch so local state follows the server's actual outcome.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{decode_record, encode_record, record_id, raw_status, MediaIndex};
use crate::context::EngineContext;
use crate::display::DisplayCell;
use crate::error::{ApiError, ListError};
use crate::field::{validate_descriptors, FieldDescriptor};
use crate::gallery::{GalleryEditor, RecordLayout};
use crate::notify::Notification;
use crate::traits::EntityClient;
use crate::value::{json_to_string, FieldValue, FileValue};

/// Rows per page.
pub const PAGE_SIZE: usize = 10;

/// Table columns shown, taken from the front of the descriptor list.
pub const MAX_COLUMNS: usize = 5;

const LOAD_FAILED: &str = "Failed to load items.";
const STATUS_FAILED: &str = "Failed to update status.";
const DELETE_FAILED: &str = "Failed to delete the item.";

/// Outcome of a bulk delete. Ids are in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
}

impl BulkDeleteReport {
    /// Single aggregate message for the whole batch.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Deleted {} item(s)", self.succeeded.len())
        } else {
            format!(
                "Deleted {} item(s), {} failed",
                self.succeeded.len(),
                self.failed.len()
            )
        }
    }
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: Option<String>,
    pub status: bool,
    pub selected: bool,
    pub cells: Vec<DisplayCell>,
}

/// One mounted list view.
pub struct ListEngine {
    fields: Vec<FieldDescriptor>,
    client: Arc<dyn EntityClient>,
    ctx: EngineContext,
    items: Vec<Value>,
    search: String,
    /// 1-based.
    page: usize,
    selected: BTreeSet<String>,
    busy: bool,
    layout: RecordLayout,
}

impl ListEngine {
    /// Builds an empty list without fetching.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Descriptor`] if the descriptor list is invalid.
    pub fn new(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, ListError> {
        validate_descriptors(&fields)?;
        Ok(Self {
            fields,
            client,
            ctx,
            items: Vec::new(),
            search: String::new(),
            page: 1,
            selected: BTreeSet::new(),
            busy: false,
            layout: RecordLayout::Flat,
        })
    }

    /// Sets how much of each entity the flat descriptors cover.
    #[must_use]
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Builds the list and fetches the collection.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Descriptor`] for invalid descriptors and
    /// [`ListError::Api`] (after notifying) when the fetch fails.
    pub async fn mount(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, ListError> {
        Self::mount_with_layout(ctx, client, fields, RecordLayout::Flat).await
    }

    /// [`ListEngine::mount`] for a module whose entities carry `layout`.
    ///
    /// # Errors
    ///
    /// See [`ListEngine::mount`].
    pub async fn mount_with_layout(
        ctx: EngineContext,
        client: Arc<dyn EntityClient>,
        fields: Vec<FieldDescriptor>,
        layout: RecordLayout,
    ) -> Result<Self, ListError> {
        let mut engine = Self::new(ctx, client, fields)?.with_layout(layout);
        engine.refresh().await?;
        Ok(engine)
    }

    /// Refetches the whole collection and clears the selection.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Api`] after notifying; the previous items are kept.
    pub async fn refresh(&mut self) -> Result<(), ListError> {
        match self.client.get_items().await {
            Ok(items) => {
                debug!(resource = self.client.resource(), count = items.len(), "collection loaded");
                self.items = items;
                self.selected.clear();
                self.page = self.page.min(self.total_pages());
                Ok(())
            }
            Err(err) => {
                warn!(resource = self.client.resource(), error = %err, "collection load failed");
                self.ctx
                    .notifier
                    .notify(Notification::error(err.user_message(LOAD_FAILED)));
                Err(err.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Descriptors rendered as table columns.
    #[must_use]
    pub fn columns(&self) -> &[FieldDescriptor] {
        &self.fields[..self.fields.len().min(MAX_COLUMNS)]
    }

    // -----------------------------------------------------------------------
    // Filter and pagination
    // -----------------------------------------------------------------------

    /// Sets the search term. A changed term resets to page 1 and clears the selection.
    pub fn filter(&mut self, term: &str) {
        if term == self.search {
            return;
        }
        self.search = term.to_string();
        self.page = 1;
        self.selected.clear();
    }

    /// Items whose string form of any declared field contains the search
    /// term, ignoring case.
    #[must_use]
    pub fn filtered_items(&self) -> Vec<&Value> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                self.fields.iter().any(|field| {
                    item.get(&field.name)
                        .map(json_to_string)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            })
            .collect()
    }

    /// Number of pages over the filtered items, at least 1.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.filtered_items().len().div_ceil(PAGE_SIZE).max(1)
    }

    /// Moves to `page` (1-based, clamped). A change clears the selection.
    pub fn set_page(&mut self, page: usize) {
        let page = page.clamp(1, self.total_pages());
        if page != self.page {
            self.page = page;
            self.selected.clear();
        }
    }

    /// Items on the current page.
    #[must_use]
    pub fn page_items(&self) -> Vec<&Value> {
        paginate(self.filtered_items(), self.page, PAGE_SIZE)
    }

    /// Read-only cell for one field of one item.
    #[must_use]
    pub fn format_for_display(&self, item: &Value, field: &FieldDescriptor) -> DisplayCell {
        field
            .field_type
            .handler()
            .display(field, item.get(&field.name), &self.ctx.storage_base_url)
    }

    /// Rendered rows of the current page over [`ListEngine::columns`].
    #[must_use]
    pub fn rows(&self) -> Vec<ListRow> {
        self.page_items()
            .into_iter()
            .map(|item| {
                let id = record_id(item);
                ListRow {
                    selected: id.as_ref().is_some_and(|id| self.selected.contains(id)),
                    status: raw_status(item),
                    cells: self
                        .columns()
                        .iter()
                        .map(|field| self.format_for_display(item, field))
                        .collect(),
                    id,
                }
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Selected ids in sorted order.
    #[must_use]
    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Flips one row's selection.
    pub fn toggle_selected(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    fn page_ids(&self) -> Vec<String> {
        self.page_items().into_iter().filter_map(record_id).collect()
    }

    /// Selects or clears every row on the current page only.
    pub fn select_all_on_page(&mut self, select: bool) {
        for id in self.page_ids() {
            if select {
                self.selected.insert(id);
            } else {
                self.selected.remove(&id);
            }
        }
    }

    /// Whether every row on the current page is selected.
    #[must_use]
    pub fn all_on_page_selected(&self) -> bool {
        let ids = self.page_ids();
        !ids.is_empty() && ids.iter().all(|id| self.selected.contains(id))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Flips an item's status and resubmits the whole record.
    ///
    /// Every declared field is decoded from the fetched item and re-encoded,
    /// because the update endpoint replaces the entity. Persisted files are
    /// left alone. A gallery entity is re-read first so its item tree, which
    /// index rows may omit, is sent back unchanged. Returns the new status.
    ///
    /// # Errors
    ///
    /// [`ListError::Busy`], [`ListError::MissingId`], or [`ListError::Api`]
    /// after notifying.
    pub async fn toggle_status(&mut self, item: &Value) -> Result<bool, ListError> {
        if self.busy {
            return Err(ListError::Busy);
        }
        let id = record_id(item).ok_or(ListError::MissingId)?;

        self.busy = true;
        let result = self.send_toggled(&id, item).await;
        self.busy = false;

        match result {
            Ok(status) => {
                info!(resource = self.client.resource(), id = %id, status, "status toggled");
                self.ctx
                    .notifier
                    .notify(Notification::success("Status updated successfully"));
                self.refresh_after_write().await;
                Ok(status)
            }
            Err(err) => {
                warn!(
                    resource = self.client.resource(),
                    id = %id,
                    error = %err,
                    "status toggle failed"
                );
                self.ctx
                    .notifier
                    .notify(Notification::error(err.user_message(STATUS_FAILED)));
                Err(err.into())
            }
        }
    }

    async fn send_toggled(&self, id: &str, item: &Value) -> Result<bool, ApiError> {
        let full;
        let source = match self.layout {
            RecordLayout::Flat => item,
            RecordLayout::Gallery => {
                full = self.client.get_item(id).await?;
                &full
            }
        };

        let mut record = decode_record(&self.fields, source);
        let status = !record.status();
        record.set_status(status);
        let mut payload = encode_record(&self.fields, &record, &self.kept_media(source));
        if self.layout == RecordLayout::Gallery {
            GalleryEditor::from_raw(self.ctx.object_urls.clone(), source).encode_tree(&mut payload);
        }
        self.client.update_item(id, payload).await?;
        Ok(status)
    }

    /// Refetch after a write that already succeeded. A failure here is
    /// notified by [`ListEngine::refresh`] and does not undo the write.
    async fn refresh_after_write(&mut self) {
        if let Err(err) = self.refresh().await {
            debug!(resource = self.client.resource(), error = %err, "refresh after write failed");
        }
    }

    /// Media fields holding a stored file count as persisted and previewed,
    /// so re-encoding neither re-uploads nor deletes them.
    fn kept_media(&self, item: &Value) -> MediaIndex {
        let record = decode_record(&self.fields, item);
        let stored: BTreeSet<String> = self
            .fields
            .iter()
            .filter(|field| {
                matches!(
                    record.get(&field.name),
                    Some(FieldValue::File(FileValue::PersistedPath(_)))
                )
            })
            .map(|field| field.name.clone())
            .collect();
        MediaIndex {
            editing: true,
            persisted: stored.clone(),
            previewed: stored,
        }
    }

    /// Deletes one item, then refetches.
    ///
    /// # Errors
    ///
    /// [`ListError::Busy`] or [`ListError::Api`] after notifying.
    pub async fn delete(&mut self, id: &str) -> Result<(), ListError> {
        if self.busy {
            return Err(ListError::Busy);
        }
        self.busy = true;
        let result = self.client.delete_item(id).await;
        self.busy = false;

        match result {
            Ok(()) => {
                info!(resource = self.client.resource(), id, "item deleted");
                self.ctx
                    .notifier
                    .notify(Notification::success("Deleted successfully"));
                self.refresh_after_write().await;
                Ok(())
            }
            Err(err) => {
                warn!(resource = self.client.resource(), id, error = %err, "delete failed");
                self.ctx
                    .notifier
                    .notify(Notification::error(err.user_message(DELETE_FAILED)));
                Err(err.into())
            }
        }
    }

    /// Deletes each id with its own call, in order, then refetches regardless
    /// of failures. Raises one aggregate notification.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Busy`] only; per-id failures land in the report.
    pub async fn bulk_delete(&mut self, ids: &[String]) -> Result<BulkDeleteReport, ListError> {
        if self.busy {
            return Err(ListError::Busy);
        }
        self.busy = true;
        let mut report = BulkDeleteReport::default();
        for id in ids {
            match self.client.delete_item(id).await {
                Ok(()) => report.succeeded.push(id.clone()),
                Err(err) => {
                    warn!(
                        resource = self.client.resource(),
                        id = %id,
                        error = %err,
                        "bulk delete item failed"
                    );
                    report.failed.push((id.clone(), err));
                }
            }
        }
        self.busy = false;

        info!(
            resource = self.client.resource(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "bulk delete finished"
        );
        let notification = if report.failed.is_empty() {
            Notification::success(report.summary())
        } else {
            Notification::error(report.summary())
        };
        self.ctx.notifier.notify(notification);
        self.refresh_after_write().await;
        Ok(report)
    }

    /// Bulk-deletes the current selection.
    ///
    /// # Errors
    ///
    /// See [`ListEngine::bulk_delete`].
    pub async fn delete_selected(&mut self) -> Result<BulkDeleteReport, ListError> {
        let ids = self.selected();
        self.bulk_delete(&ids).await
    }
}

impl std::fmt::Debug for ListEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListEngine")
            .field("resource", &self.client.resource())
            .field("items", &self.items.len())
            .field("search", &self.search)
            .field("page", &self.page)
            .field("selected", &self.selected)
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}

/// Slices `items` into the 1-based `page` of `page_size` rows.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    items.into_iter().skip(start).take(page_size).collect()
}
