//! Props store the rendering layer reads widget components from.

use core::fmt;

use hashbrown::HashMap;
use parking_lot::RwLock;
use thunderbolt_components_loader::Component;

/// Per-instance props written before the page mounts.
///
/// Only the `ReactComponent` prop of widget instances flows through here.
pub trait PropsStore: Send + Sync + 'static {
    /// Sets the component an instance renders.
    fn update_react_component(&self, comp_id: &str, component: Component);

    /// Returns the component an instance renders.
    fn react_component(&self, comp_id: &str) -> Option<Component>;
}

/// A [`PropsStore`] kept in memory.
#[derive(Default)]
pub struct InMemoryPropsStore {
    components: RwLock<HashMap<String, Component>>,
}

impl InMemoryPropsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the comp ids that have a component, sorted.
    #[must_use]
    pub fn comp_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.components.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl PropsStore for InMemoryPropsStore {
    fn update_react_component(&self, comp_id: &str, component: Component) {
        self.components.write().insert(comp_id.to_string(), component);
    }

    fn react_component(&self, comp_id: &str) -> Option<Component> {
        self.components.read().get(comp_id).cloned()
    }
}

impl fmt::Debug for InMemoryPropsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPropsStore")
            .field("comp_ids", &self.comp_ids())
            .finish()
    }
}
