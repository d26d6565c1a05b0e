//! Page-scoped registries shared by every resolution.
//!
//! [`Registries`] owns the three maps of a page session:
//!
//! - loaders: key → [`LoaderFn`], filled by library merges, lazy manifests
//!   and explicit registrations
//! - components: key → resolved, wrapped [`Component`]
//! - controllers: key → [`CompController`] extracted at resolution time
//!
//! Nothing is ever removed. Resolved components and controllers are
//! first-write-wins, so concurrent resolutions of the same key can never
//! replace an implementation the renderer already holds.
//!
//! # Thread Safety
//!
//! Each map sits behind its own [`RwLock`]; no lock is held across an await.

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::component::{CompController, Component};
use crate::entry::{LoaderFn, LoaderMap};
use crate::key::ComponentTypeKey;

/// Loader, component and controller registries of one page session.
#[derive(Default)]
pub struct Registries {
    loaders: RwLock<LoaderMap>,
    components: RwLock<HashMap<ComponentTypeKey, Component>>,
    controllers: RwLock<HashMap<ComponentTypeKey, CompController>>,
}

impl core::fmt::Debug for Registries {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registries")
            .field("loaders", &self.loader_keys())
            .field("components", &self.components.read().len())
            .field("controllers", &self.controllers.read().len())
            .finish()
    }
}

impl Registries {
    /// Creates empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loaders
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers (or replaces) the loader for a key.
    pub fn insert_loader(&self, key: ComponentTypeKey, loader: LoaderFn) {
        self.loaders.write().insert(key, loader);
    }

    /// Merges a batch of loaders; later entries replace earlier ones.
    pub fn extend_loaders(&self, loaders: LoaderMap) {
        self.loaders.write().extend(loaders);
    }

    /// Merges a batch of loaders, keeping any loader already registered.
    pub fn extend_missing_loaders(&self, loaders: LoaderMap) {
        let mut current = self.loaders.write();
        for (key, loader) in loaders {
            current.entry(key).or_insert(loader);
        }
    }

    /// Returns the loader for a key.
    #[must_use]
    pub fn loader(&self, key: &str) -> Option<LoaderFn> {
        self.loaders.read().get(key).cloned()
    }

    /// Returns whether a loader is registered for a key.
    #[must_use]
    pub fn has_loader(&self, key: &str) -> bool {
        self.loaders.read().contains_key(key)
    }

    /// Returns every key with a registered loader, in registration order.
    #[must_use]
    pub fn loader_keys(&self) -> Vec<ComponentTypeKey> {
        self.loaders.read().keys().cloned().collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Components
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores a resolved component unless the key already has one.
    ///
    /// Returns the component that is registered after the call: the given one
    /// if the slot was empty, otherwise the existing one.
    pub fn insert_component(&self, key: ComponentTypeKey, component: Component) -> Component {
        self.components
            .write()
            .entry(key)
            .or_insert(component)
            .clone()
    }

    /// Returns the resolved component for a key.
    #[must_use]
    pub fn component(&self, key: &str) -> Option<Component> {
        self.components.read().get(key).cloned()
    }

    /// Returns whether a key has been resolved.
    #[must_use]
    pub fn has_component(&self, key: &str) -> bool {
        self.components.read().contains_key(key)
    }

    /// Returns a snapshot of every resolved component.
    #[must_use]
    pub fn components(&self) -> HashMap<ComponentTypeKey, Component> {
        self.components.read().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Controllers
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores a controller unless the key already has one.
    pub fn insert_controller(&self, key: ComponentTypeKey, controller: CompController) {
        self.controllers.write().entry(key).or_insert(controller);
    }

    /// Returns the controller for a key.
    #[must_use]
    pub fn controller(&self, key: &str) -> Option<CompController> {
        self.controllers.read().get(key).cloned()
    }

    /// Returns a snapshot of every controller.
    #[must_use]
    pub fn controllers(&self) -> HashMap<ComponentTypeKey, CompController> {
        self.controllers.read().clone()
    }
}
