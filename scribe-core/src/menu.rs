// Context-menu model
// One parent entry for text selections with a child per registered action, plus a
// standalone entry for images

use serde::Serialize;

use crate::registry::ActionRegistry;

pub const PARENT_MENU_ID: &str = "scribeParent";
pub const IMAGE_MENU_ID: &str = "scribeImage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    Selection,
    Image,
}

impl MenuContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuContext::Selection => "selection",
            MenuContext::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub title: String,
    pub contexts: Vec<MenuContext>,
}

pub fn build_menu(registry: &ActionRegistry) -> Vec<MenuEntry> {
    let mut entries = Vec::with_capacity(registry.len() + 2);

    entries.push(MenuEntry {
        id: PARENT_MENU_ID.to_string(),
        parent_id: None,
        title: "Scribe Assistant".to_string(),
        contexts: vec![MenuContext::Selection],
    });

    entries.extend(registry.iter().map(|spec| MenuEntry {
        id: spec.id.to_string(),
        parent_id: Some(PARENT_MENU_ID.to_string()),
        title: format!("{} {}", spec.icon, spec.title),
        contexts: vec![MenuContext::Selection],
    }));

    entries.push(MenuEntry {
        id: IMAGE_MENU_ID.to_string(),
        parent_id: None,
        title: "🖼️ Analyze Image".to_string(),
        contexts: vec![MenuContext::Image],
    });

    entries
}
