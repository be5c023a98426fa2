//! Album gallery editor: a gallery of items, each with sub-items holding images.
//!
//! New images hold an [`ObjectUrl`] lease for their preview, so removing an
//! image, a sub-item, or a whole item releases every preview below it, and
//! dropping the editor releases the rest. Persisted images that the user
//! removes are remembered and sent as `removed_images[]`.
//!
//! Wire keys:
//!
//! ```text
//! title, status
//! items[i][id], items[i][title]
//! items[i][sub_items][j][id], items[i][sub_items][j][title]
//! items[i][sub_items][j][images][k]            new uploads
//! items[i][sub_items][j][existing_images][]    kept persisted paths
//! removed_images[]
//! ```
//!
//! A module with [`RecordLayout::Gallery`] carries this tree next to its flat
//! descriptors; the form and list engines append it through
//! [`GalleryEditor::encode_tree`] so a write never drops stored items.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::codec::{raw_status, record_id};
use crate::field::STATUS_FIELD;
use crate::payload::FormPayload;
use crate::preview::{storage_url, ObjectUrl, ObjectUrlFactory};
use crate::value::{bool_flag, json_to_string, FileUpload};

/// How much of an entity the flat field codec covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// Every stored field is a declared descriptor.
    #[default]
    Flat,
    /// Descriptors plus a nested item / sub-item / image tree.
    Gallery,
}

/// One image of a sub-item.
#[derive(Debug)]
pub enum GalleryImage {
    /// Already stored on the backend.
    Persisted { id: Option<String>, path: String },
    /// Chosen locally, previewed through a lease.
    New { upload: FileUpload, preview: ObjectUrl },
}

impl GalleryImage {
    /// Preview URL for rendering.
    #[must_use]
    pub fn src(&self, storage_base_url: &str) -> String {
        match self {
            Self::Persisted { path, .. } => storage_url(storage_base_url, path),
            Self::New { preview, .. } => preview.as_str().to_string(),
        }
    }

    fn removal_key(&self) -> Option<String> {
        match self {
            Self::Persisted { id, path } => Some(id.clone().unwrap_or_else(|| path.clone())),
            Self::New { .. } => None,
        }
    }

    fn from_raw(raw: &Value) -> Option<Self> {
        let (id, path) = match raw {
            Value::String(path) => (None, path.clone()),
            Value::Object(map) => {
                let path = ["path", "image", "url"]
                    .iter()
                    .find_map(|key| map.get(*key).map(json_to_string))
                    .unwrap_or_default();
                (record_id(raw), path)
            }
            _ => return None,
        };
        (!path.is_empty()).then_some(Self::Persisted { id, path })
    }
}

#[derive(Debug, Default)]
pub struct GallerySubItem {
    pub id: Option<String>,
    pub title: String,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Default)]
pub struct GalleryItem {
    pub id: Option<String>,
    pub title: String,
    pub sub_items: Vec<GallerySubItem>,
}

/// Index path out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no gallery entry at {path}")]
pub struct GalleryIndexError {
    pub path: String,
}

/// Editable album gallery.
pub struct GalleryEditor {
    object_urls: Arc<dyn ObjectUrlFactory>,
    pub title: String,
    pub status: bool,
    items: Vec<GalleryItem>,
    removed_images: Vec<String>,
}

impl GalleryEditor {
    /// Empty gallery for create mode.
    #[must_use]
    pub fn new(object_urls: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            object_urls,
            title: String::new(),
            status: true,
            items: Vec::new(),
            removed_images: Vec::new(),
        }
    }

    /// Gallery populated from a backend entity.
    ///
    /// Accepts `sub_items`/`subItems` and images as bare paths or objects
    /// carrying `id` and one of `path`, `image`, `url`.
    #[must_use]
    pub fn from_raw(object_urls: Arc<dyn ObjectUrlFactory>, raw: &Value) -> Self {
        let mut editor = Self::new(object_urls);
        editor.title = raw.get("title").map(json_to_string).unwrap_or_default();
        editor.status = raw_status(raw);
        editor.items = array(raw, &["items"])
            .iter()
            .map(|item| GalleryItem {
                id: record_id(item),
                title: item.get("title").map(json_to_string).unwrap_or_default(),
                sub_items: array(item, &["sub_items", "subItems"])
                    .iter()
                    .map(|sub| GallerySubItem {
                        id: record_id(sub),
                        title: sub.get("title").map(json_to_string).unwrap_or_default(),
                        images: array(sub, &["images"])
                            .iter()
                            .filter_map(GalleryImage::from_raw)
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        editor
    }

    #[must_use]
    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    /// Ids (or paths) of persisted images the user removed.
    #[must_use]
    pub fn removed_images(&self) -> &[String] {
        &self.removed_images
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Appends an item and returns its index.
    pub fn add_item(&mut self, title: impl Into<String>) -> usize {
        self.items.push(GalleryItem {
            title: title.into(),
            ..GalleryItem::default()
        });
        self.items.len() - 1
    }

    /// Removes an item with all of its sub-items and images.
    ///
    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn remove_item(&mut self, item: usize) -> Result<(), GalleryIndexError> {
        if item >= self.items.len() {
            return Err(index_error(&[item]));
        }
        let removed = self.items.remove(item);
        for sub in &removed.sub_items {
            self.forget_images(&sub.images);
        }
        debug!(item, "gallery item removed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn set_item_title(
        &mut self,
        item: usize,
        title: impl Into<String>,
    ) -> Result<(), GalleryIndexError> {
        self.item_mut(item)?.title = title.into();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sub-items
    // -----------------------------------------------------------------------

    /// Appends a sub-item under `item` and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn add_sub_item(
        &mut self,
        item: usize,
        title: impl Into<String>,
    ) -> Result<usize, GalleryIndexError> {
        let parent = self.item_mut(item)?;
        parent.sub_items.push(GallerySubItem {
            title: title.into(),
            ..GallerySubItem::default()
        });
        Ok(parent.sub_items.len() - 1)
    }

    /// Removes a sub-item with all of its images.
    ///
    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn remove_sub_item(&mut self, item: usize, sub: usize) -> Result<(), GalleryIndexError> {
        let parent = self.item_mut(item)?;
        if sub >= parent.sub_items.len() {
            return Err(index_error(&[item, sub]));
        }
        let removed = parent.sub_items.remove(sub);
        self.forget_images(&removed.images);
        debug!(item, sub, "gallery sub-item removed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn set_sub_item_title(
        &mut self,
        item: usize,
        sub: usize,
        title: impl Into<String>,
    ) -> Result<(), GalleryIndexError> {
        self.sub_item_mut(item, sub)?.title = title.into();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    /// Adds a locally chosen image and returns its preview URL.
    ///
    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn add_image(
        &mut self,
        item: usize,
        sub: usize,
        upload: FileUpload,
    ) -> Result<String, GalleryIndexError> {
        let preview = ObjectUrl::acquire(&self.object_urls, &upload);
        let src = preview.as_str().to_string();
        self.sub_item_mut(item, sub)?
            .images
            .push(GalleryImage::New { upload, preview });
        Ok(src)
    }

    /// Removes one image. A persisted image is queued for deletion.
    ///
    /// # Errors
    ///
    /// Returns [`GalleryIndexError`] for a bad index.
    pub fn remove_image(
        &mut self,
        item: usize,
        sub: usize,
        image: usize,
    ) -> Result<(), GalleryIndexError> {
        let images = &mut self.sub_item_mut(item, sub)?.images;
        if image >= images.len() {
            return Err(index_error(&[item, sub, image]));
        }
        let removed = images.remove(image);
        self.forget_images(std::slice::from_ref(&removed));
        Ok(())
    }

    fn forget_images(&mut self, images: &[GalleryImage]) {
        self.removed_images
            .extend(images.iter().filter_map(GalleryImage::removal_key));
    }

    fn item_mut(&mut self, item: usize) -> Result<&mut GalleryItem, GalleryIndexError> {
        self.items.get_mut(item).ok_or_else(|| index_error(&[item]))
    }

    fn sub_item_mut(
        &mut self,
        item: usize,
        sub: usize,
    ) -> Result<&mut GallerySubItem, GalleryIndexError> {
        self.item_mut(item)?
            .sub_items
            .get_mut(sub)
            .ok_or_else(|| index_error(&[item, sub]))
    }

    // -----------------------------------------------------------------------
    // Encode
    // -----------------------------------------------------------------------

    /// Multipart body for create or update.
    #[must_use]
    pub fn encode(&self) -> FormPayload {
        let mut payload = FormPayload::new();
        if !self.title.is_empty() {
            payload.append_text("title", self.title.clone());
        }
        payload.append_text(STATUS_FIELD, bool_flag(self.status));
        self.encode_tree(&mut payload);
        payload
    }

    /// Appends the item tree and the removal queue, leaving top-level fields
    /// to the caller.
    pub fn encode_tree(&self, payload: &mut FormPayload) {
        for (i, item) in self.items.iter().enumerate() {
            let item_key = format!("items[{i}]");
            if let Some(id) = &item.id {
                payload.append_text(format!("{item_key}[id]"), id.clone());
            }
            payload.append_text(format!("{item_key}[title]"), item.title.clone());

            for (j, sub) in item.sub_items.iter().enumerate() {
                let sub_key = format!("{item_key}[sub_items][{j}]");
                if let Some(id) = &sub.id {
                    payload.append_text(format!("{sub_key}[id]"), id.clone());
                }
                payload.append_text(format!("{sub_key}[title]"), sub.title.clone());

                let mut k = 0;
                for image in &sub.images {
                    match image {
                        GalleryImage::Persisted { path, .. } => {
                            payload
                                .append_text(format!("{sub_key}[existing_images][]"), path.clone());
                        }
                        GalleryImage::New { upload, .. } => {
                            payload.append_file(format!("{sub_key}[images][{k}]"), upload.clone());
                            k += 1;
                        }
                    }
                }
            }
        }

        for removed in &self.removed_images {
            payload.append_text("removed_images[]", removed.clone());
        }
    }
}

impl std::fmt::Debug for GalleryEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryEditor")
            .field("title", &self.title)
            .field("status", &self.status)
            .field("items", &self.items)
            .field("removed_images", &self.removed_images)
            .finish_non_exhaustive()
    }
}

fn array<'a>(raw: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn index_error(path: &[usize]) -> GalleryIndexError {
    GalleryIndexError {
        path: path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::preview::BlobUrlRegistry;

    fn registry() -> (Arc<BlobUrlRegistry>, Arc<dyn ObjectUrlFactory>) {
        let registry = Arc::new(BlobUrlRegistry::new("http://admin.test"));
        let factory: Arc<dyn ObjectUrlFactory> = registry.clone();
        (registry, factory)
    }

    fn jpg(name: &str) -> FileUpload {
        FileUpload::new(name, "image/jpeg", vec![0xff, 0xd8])
    }

    fn stored() -> Value {
        json!({
            "id": 3,
            "title": "Campus",
            "status": 1,
            "items": [{
                "id": 10,
                "title": "Library",
                "sub_items": [{
                    "id": 20,
                    "title": "Reading room",
                    "images": [
                        {"id": 100, "path": "gallery/a.jpg"},
                        "gallery/b.jpg"
                    ]
                }]
            }]
        })
    }

    #[test]
    fn decodes_nested_tree() {
        let (_, factory) = registry();
        let editor = GalleryEditor::from_raw(factory, &stored());

        assert_eq!(editor.title, "Campus");
        let sub = &editor.items()[0].sub_items[0];
        assert_eq!(sub.id.as_deref(), Some("20"));
        assert_eq!(sub.images.len(), 2);
        assert_eq!(
            sub.images[0].src("https://cdn.test"),
            "https://cdn.test/gallery/a.jpg"
        );
    }

    #[test]
    fn encodes_nested_keys() {
        let (_, factory) = registry();
        let mut editor = GalleryEditor::from_raw(factory, &stored());
        editor.add_image(0, 0, jpg("c.jpg")).unwrap();
        let item = editor.add_item("Gym");
        let sub = editor.add_sub_item(item, "Pool").unwrap();
        editor.add_image(item, sub, jpg("d.jpg")).unwrap();

        let payload = editor.encode();

        assert_eq!(payload.text("items[0][id]"), Some("10"));
        assert_eq!(payload.text("items[0][sub_items][0][title]"), Some("Reading room"));
        assert_eq!(
            payload.texts("items[0][sub_items][0][existing_images][]"),
            vec!["gallery/a.jpg", "gallery/b.jpg"]
        );
        assert_eq!(
            payload.file("items[0][sub_items][0][images][0]").unwrap().file_name,
            "c.jpg"
        );
        assert_eq!(payload.text("items[1][title]"), Some("Gym"));
        assert!(!payload.contains("items[1][id]"));
        assert_eq!(
            payload.file("items[1][sub_items][0][images][0]").unwrap().file_name,
            "d.jpg"
        );
        assert_eq!(payload.text("status"), Some("1"));
    }

    #[test]
    fn tree_encoding_leaves_top_level_fields_to_caller() {
        let (_, factory) = registry();
        let editor = GalleryEditor::from_raw(factory, &stored());
        let mut payload = FormPayload::new();
        payload.append_text("title", "Campus");

        editor.encode_tree(&mut payload);

        assert_eq!(payload.texts("title"), vec!["Campus"]);
        assert!(!payload.contains("status"));
        assert_eq!(payload.text("items[0][sub_items][0][id]"), Some("20"));
        assert_eq!(
            payload.texts("items[0][sub_items][0][existing_images][]"),
            vec!["gallery/a.jpg", "gallery/b.jpg"]
        );
    }

    #[test]
    fn layout_reads_snake_case_and_defaults_to_flat() {
        assert_eq!(RecordLayout::default(), RecordLayout::Flat);
        let layout: RecordLayout = serde_json::from_value(json!("gallery")).unwrap();
        assert_eq!(layout, RecordLayout::Gallery);
    }

    #[test]
    fn removing_persisted_image_queues_its_id() {
        let (_, factory) = registry();
        let mut editor = GalleryEditor::from_raw(factory, &stored());

        editor.remove_image(0, 0, 0).unwrap();
        editor.remove_image(0, 0, 0).unwrap();

        assert_eq!(editor.removed_images(), ["100", "gallery/b.jpg"]);
        let payload = editor.encode();
        assert_eq!(payload.texts("removed_images[]"), vec!["100", "gallery/b.jpg"]);
        assert!(!payload.contains("items[0][sub_items][0][existing_images][]"));
    }

    #[test]
    fn removing_subtree_releases_previews() {
        let (registry, factory) = registry();
        let mut editor = GalleryEditor::new(factory);
        let item = editor.add_item("Trip");
        let first = editor.add_sub_item(item, "Day 1").unwrap();
        let second = editor.add_sub_item(item, "Day 2").unwrap();
        editor.add_image(item, first, jpg("1.jpg")).unwrap();
        editor.add_image(item, first, jpg("2.jpg")).unwrap();
        editor.add_image(item, second, jpg("3.jpg")).unwrap();
        assert_eq!(registry.live_count(), 3);

        editor.remove_sub_item(item, first).unwrap();
        assert_eq!(registry.live_count(), 1);

        editor.remove_item(item).unwrap();
        assert_eq!(registry.live_count(), 0);
        assert!(editor.removed_images().is_empty());
        assert_eq!(registry.double_revoke_count(), 0);
    }

    #[test]
    fn dropping_editor_releases_remaining_previews() {
        let (registry, factory) = registry();
        let mut editor = GalleryEditor::new(factory);
        let item = editor.add_item("A");
        let sub = editor.add_sub_item(item, "B").unwrap();
        editor.add_image(item, sub, jpg("x.jpg")).unwrap();

        drop(editor);

        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.revoked_count(), 1);
    }

    #[test]
    fn bad_indexes_are_reported() {
        let (_, factory) = registry();
        let mut editor = GalleryEditor::new(factory);
        assert_eq!(editor.add_sub_item(2, "x").unwrap_err().path, "2");
        let item = editor.add_item("A");
        assert_eq!(editor.remove_image(item, 0, 0).unwrap_err().path, "0/0");
    }
}
