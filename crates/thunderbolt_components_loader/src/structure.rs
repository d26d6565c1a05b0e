//! Page structure as seen by the loader.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::key::{BUILDER_PATHS_CONTAINER, ComponentTypeKey, REF_COMPONENT};

/// Declared type of one component instance.
///
/// Other structure fields are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEntry {
    /// Declared component type.
    pub component_type: String,
    /// Optional UI variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
}

impl StructureEntry {
    /// Creates an entry without a UI variant.
    #[must_use]
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            ui_type: None,
        }
    }

    /// Sets the UI variant.
    #[must_use]
    pub fn with_ui_type(mut self, ui_type: impl Into<String>) -> Self {
        self.ui_type = Some(ui_type.into());
        self
    }

    /// Returns the key this instance is rendered with.
    #[must_use]
    pub fn key(&self) -> ComponentTypeKey {
        ComponentTypeKey::new(&self.component_type, self.ui_type.as_deref())
    }
}

/// Component instances of a page, keyed by comp id.
pub type AppStructure = IndexMap<String, StructureEntry>;

/// Returns the distinct keys a structure requires, in first-occurrence order.
///
/// A `RefComponent` also requires `BuilderPathsContainer`.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::{AppStructure, StructureEntry, required_keys};
///
/// let mut structure = AppStructure::new();
/// structure.insert("a".into(), StructureEntry::new("Text"));
/// structure.insert("b".into(), StructureEntry::new("Button").with_ui_type("Primary"));
/// structure.insert("c".into(), StructureEntry::new("Text"));
///
/// let keys: Vec<String> = required_keys(&structure).iter().map(ToString::to_string).collect();
/// assert_eq!(keys, ["Text", "Button_Primary"]);
/// ```
#[must_use]
pub fn required_keys(structure: &AppStructure) -> Vec<ComponentTypeKey> {
    let mut keys: IndexSet<ComponentTypeKey> = structure.values().map(StructureEntry::key).collect();
    if keys.contains(REF_COMPONENT) {
        keys.insert(ComponentTypeKey::from(BUILDER_PATHS_CONTAINER));
    }
    keys.into_iter().collect()
}
