//! Component libraries and their one-shot aggregation.
//!
//! A library ([`ComponentsRegistrar`]) exposes a synchronous map of loader
//! entries and, optionally, a [`LazyManifest`] that fetches more entries on
//! demand. The [`LibraryAggregator`] merges every library into the page's
//! [`Registries`] exactly once, and runs the lazy manifests only when a
//! lookup first misses.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use thunderbolt_core::PhaseLogger;
use tokio::sync::OnceCell;

use crate::entry::{LazyManifest, LoaderFn, LoaderMap};
use crate::error::{LoaderError, ModuleError};
use crate::key::ComponentTypeKey;
use crate::registry::Registries;

/// Source of component loaders.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::{
///     Component, ComponentModule, ComponentsRegistrar, LoaderMap, ModuleError, loader_fn,
/// };
///
/// struct ButtonsLibrary;
///
/// impl ComponentsRegistrar for ButtonsLibrary {
///     fn components(&self) -> Result<LoaderMap, ModuleError> {
///         let mut map = LoaderMap::new();
///         map.insert(
///             "Button".into(),
///             loader_fn(|| async { Ok(ComponentModule::default_export(Component::new("button"))) }),
///         );
///         Ok(map)
///     }
/// }
/// ```
pub trait ComponentsRegistrar: Send + Sync + 'static {
    /// Returns the loaders this library provides up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot enumerate its loaders.
    fn components(&self) -> Result<LoaderMap, ModuleError>;

    /// Returns a manifest that fetches the library's remaining loaders.
    fn lazy_manifest(&self) -> Option<LazyManifest> {
        None
    }

    /// Returns the library's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

/// Future resolving to libraries that are only known asynchronously.
pub type ComponentLibraries = BoxFuture<'static, Result<Vec<Arc<dyn ComponentsRegistrar>>, LoaderError>>;

/// A library assembled in code.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::{Component, ComponentLibrary, ComponentModule, loader_fn};
///
/// let library = ComponentLibrary::new("site")
///     .with_loader("Text", loader_fn(|| async {
///         Ok(ComponentModule::component(Component::new("text")))
///     }));
/// # let _ = library;
/// ```
#[derive(Clone)]
pub struct ComponentLibrary {
    name: String,
    loaders: LoaderMap,
    lazy: Option<LazyManifest>,
}

impl core::fmt::Debug for ComponentLibrary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentLibrary")
            .field("name", &self.name)
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .field("lazy", &self.lazy.is_some())
            .finish()
    }
}

impl ComponentLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loaders: LoaderMap::new(),
            lazy: None,
        }
    }

    /// Adds a loader entry.
    #[must_use]
    pub fn with_loader(mut self, key: impl Into<ComponentTypeKey>, loader: LoaderFn) -> Self {
        self.loaders.insert(key.into(), loader);
        self
    }

    /// Sets the lazy manifest.
    #[must_use]
    pub fn with_lazy_manifest(mut self, manifest: LazyManifest) -> Self {
        self.lazy = Some(manifest);
        self
    }
}

impl ComponentsRegistrar for ComponentLibrary {
    fn components(&self) -> Result<LoaderMap, ModuleError> {
        Ok(self.loaders.clone())
    }

    fn lazy_manifest(&self) -> Option<LazyManifest> {
        self.lazy.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LibraryAggregator
// ─────────────────────────────────────────────────────────────────────────────

/// Merges libraries into the loader registry, once.
pub(crate) struct LibraryAggregator {
    registries: Arc<Registries>,
    registrars: Vec<Arc<dyn ComponentsRegistrar>>,
    libraries: Mutex<Option<ComponentLibraries>>,
    registered: OnceCell<Result<(), LoaderError>>,
    manifests: Mutex<Vec<LazyManifest>>,
    has_manifests: AtomicBool,
    manifests_settled: OnceCell<()>,
    phases: PhaseLogger,
}

impl LibraryAggregator {
    pub(crate) fn new(
        registries: Arc<Registries>,
        registrars: Vec<Arc<dyn ComponentsRegistrar>>,
        libraries: Option<ComponentLibraries>,
        phases: PhaseLogger,
    ) -> Self {
        Self {
            registries,
            registrars,
            libraries: Mutex::new(libraries),
            registered: OnceCell::new(),
            manifests: Mutex::new(Vec::new()),
            has_manifests: AtomicBool::new(false),
            manifests_settled: OnceCell::new(),
            phases,
        }
    }

    /// Waits for the one-shot library merge.
    ///
    /// The first caller runs the merge; every other caller waits for it and
    /// observes the same outcome, failure included.
    pub(crate) async fn ensure_registered(&self) -> Result<(), LoaderError> {
        self.registered
            .get_or_init(|| self.register_libraries())
            .await
            .clone()
    }

    async fn register_libraries(&self) -> Result<(), LoaderError> {
        self.phases.phase_started("componentsLibraries");
        let pending = self.libraries.lock().take();
        let mut libs = self.registrars.clone();
        if let Some(pending) = pending {
            match pending.await {
                Ok(loaded) => libs.extend(loaded),
                Err(err) => {
                    self.phases.phase_ended("componentsLibraries");
                    return Err(err);
                }
            }
        }
        self.phases.phase_ended("componentsLibraries");

        self.phases.phase_started("componentLoaders");
        let merged = self.merge(&libs);
        self.phases.phase_ended("componentLoaders");

        match &merged {
            Ok(()) => tracing::debug!(
                libraries = libs.len(),
                lazy_manifests = self.pending_manifests(),
                "component libraries registered"
            ),
            Err(err) => tracing::error!(error = %err, "component libraries aggregation failed"),
        }
        merged
    }

    fn merge(&self, libs: &[Arc<dyn ComponentsRegistrar>]) -> Result<(), LoaderError> {
        for lib in libs {
            let components = lib
                .components()
                .map_err(|err| LoaderError::library(lib.name(), err))?;
            tracing::debug!(library = lib.name(), count = components.len(), "merging loaders");
            self.registries.extend_loaders(components);

            if let Some(manifest) = lib.lazy_manifest() {
                self.manifests.lock().push(manifest);
                self.has_manifests.store(true, Ordering::Release);
            }
        }
        Ok(())
    }

    /// Returns the number of lazy manifests still waiting for a lookup miss.
    pub(crate) fn pending_manifests(&self) -> usize {
        self.manifests.lock().len()
    }

    /// Looks up the loader for a key, running lazy manifests on the first miss.
    pub(crate) async fn loader_for(&self, key: &ComponentTypeKey) -> Option<LoaderFn> {
        if let Some(loader) = self.registries.loader(key.as_str()) {
            return Some(loader);
        }
        if !self.has_manifests.load(Ordering::Acquire) {
            return None;
        }

        if !self.manifests_settled.initialized() {
            tracing::debug!(%key, "loader missing, resolving lazy manifests");
        }
        self.manifests_settled
            .get_or_init(|| self.resolve_manifests())
            .await;
        self.registries.loader(key.as_str())
    }

    async fn resolve_manifests(&self) {
        let manifests = core::mem::take(&mut *self.manifests.lock());
        let results = join_all(manifests.iter().map(|manifest| manifest())).await;

        for result in results {
            match result {
                Ok(loaders) => self.registries.extend_missing_loaders(loaders),
                Err(err) => tracing::warn!(error = %err, "lazy manifest failed"),
            }
        }
    }
}
