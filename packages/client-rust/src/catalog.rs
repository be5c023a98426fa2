//! Built-in entity declarations.
//!
//! Each entity is only a descriptor list plus its resource route; all of them
//! run through the shared form and list engines.

use cms_admin_core::field::{FieldDescriptor, FieldType};
use cms_admin_core::gallery::RecordLayout;
use cms_admin_core::module::ModuleDefinition;

fn field(name: &str, label: &str, field_type: FieldType) -> FieldDescriptor {
    FieldDescriptor::new(name, label, field_type)
}

#[must_use]
pub fn news() -> ModuleDefinition {
    ModuleDefinition::new(
        "News",
        "news",
        vec![
            field("title", "Title", FieldType::Text).required(),
            field("published_at", "Published at", FieldType::Date).required(),
            field("image", "Image", FieldType::Image),
            field("is_featured", "Featured", FieldType::Boolean),
            field("excerpt", "Excerpt", FieldType::Textarea),
            field("slug", "Slug", FieldType::Text),
            field("content", "Content", FieldType::Richtext).required(),
            field("attachment", "Attachment", FieldType::File),
        ],
    )
}

#[must_use]
pub fn pages() -> ModuleDefinition {
    ModuleDefinition::new(
        "Pages",
        "pages",
        vec![
            field("title", "Title", FieldType::Text).required(),
            field("slug", "Slug", FieldType::Text).required(),
            field("banner", "Banner", FieldType::Image),
            field("template", "Template", FieldType::Select).with_options([
                ("default", "Default"),
                ("full-width", "Full width"),
                ("landing", "Landing"),
            ]),
            field("content", "Content", FieldType::Richtext),
            field("meta_title", "Meta title", FieldType::Text),
            field("meta_description", "Meta description", FieldType::Textarea),
        ],
    )
}

#[must_use]
pub fn popups() -> ModuleDefinition {
    ModuleDefinition::new(
        "Popups",
        "popups",
        vec![
            field("title", "Title", FieldType::Text).required(),
            field("image", "Image", FieldType::Image),
            field("start_date", "Start date", FieldType::Date),
            field("end_date", "End date", FieldType::Date),
            field("link", "Link", FieldType::Url),
            field("content", "Content", FieldType::Richtext),
            field("frequency", "Show", FieldType::Radio).with_options([
                ("always", "Every visit"),
                ("once", "Once per visitor"),
                ("daily", "Once a day"),
            ]),
        ],
    )
}

#[must_use]
pub fn menus() -> ModuleDefinition {
    ModuleDefinition::new(
        "Menus",
        "menus",
        vec![
            field("title", "Title", FieldType::Text).required(),
            field("url", "URL", FieldType::Url).required(),
            field("position", "Position", FieldType::Select)
                .with_options([("header", "Header"), ("footer", "Footer")]),
            field("parent_id", "Parent", FieldType::Number),
            field("order", "Order", FieldType::Number),
            field("target", "Open in", FieldType::Select)
                .with_options([("_self", "Same tab"), ("_blank", "New tab")]),
        ],
    )
}

#[must_use]
pub fn social_icons() -> ModuleDefinition {
    ModuleDefinition::new(
        "Social icons",
        "social-icons",
        vec![
            field("name", "Name", FieldType::Text).required(),
            field("url", "URL", FieldType::Url).required(),
            field("icon", "Icon", FieldType::Image),
            field("color", "Color", FieldType::Color),
            field("order", "Order", FieldType::Number),
        ],
    )
}

/// Top-level album fields. Items, sub-items, and their images ride along
/// through the gallery layout and are edited with
/// [`cms_admin_core::gallery::GalleryEditor`].
#[must_use]
pub fn album_galleries() -> ModuleDefinition {
    ModuleDefinition::new(
        "Album galleries",
        "album-galleries",
        vec![
            field("title", "Title", FieldType::Text).required(),
            field("cover_image", "Cover image", FieldType::Image),
            field("event_date", "Event date", FieldType::Date),
            field("description", "Description", FieldType::Textarea),
        ],
    )
    .with_layout(RecordLayout::Gallery)
}

#[must_use]
pub fn users() -> ModuleDefinition {
    ModuleDefinition::new(
        "Users",
        "users",
        vec![
            field("name", "Name", FieldType::Text).required(),
            field("email", "Email", FieldType::Email).required(),
            field("role", "Role", FieldType::Select).required().with_options([
                ("admin", "Administrator"),
                ("editor", "Editor"),
            ]),
            field("avatar", "Avatar", FieldType::Image),
            field("password", "Password", FieldType::Text),
            field("permissions", "Permissions", FieldType::Checkbox).with_options([
                ("news", "News"),
                ("pages", "Pages"),
                ("menus", "Menus"),
                ("galleries", "Galleries"),
            ]),
        ],
    )
}

/// Every built-in entity.
#[must_use]
pub fn builtin_modules() -> Vec<ModuleDefinition> {
    vec![
        news(),
        pages(),
        popups(),
        menus(),
        social_icons(),
        album_galleries(),
        users(),
    ]
}

#[cfg(test)]
mod tests {
    use cms_admin_core::field::validate_descriptors;

    use super::*;

    #[test]
    fn every_builtin_is_valid() {
        for module in builtin_modules() {
            validate_descriptors(&module.fields)
                .unwrap_or_else(|err| panic!("{} is invalid: {err}", module.name));
            assert!(!module.fields.is_empty(), "{} has no fields", module.name);
        }
    }

    #[test]
    fn routes_are_unique() {
        let modules = builtin_modules();
        let mut routes: Vec<String> = modules.iter().map(ModuleDefinition::route).collect();
        routes.sort();
        routes.dedup();
        assert_eq!(routes.len(), modules.len());
    }

    #[test]
    fn only_albums_carry_a_gallery_tree() {
        let galleries: Vec<String> = builtin_modules()
            .iter()
            .filter(|module| module.layout == RecordLayout::Gallery)
            .map(ModuleDefinition::route)
            .collect();
        assert_eq!(galleries, vec!["album-galleries".to_string()]);
    }

    #[test]
    fn option_fields_have_options() {
        for module in builtin_modules() {
            for field in module.fields.iter().filter(|f| f.field_type.has_options()) {
                assert!(!field.options.is_empty(), "{}.{}", module.name, field.name);
            }
        }
    }
}
