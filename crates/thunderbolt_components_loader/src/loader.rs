//! The public components loader.
//!
//! [`ComponentsLoader`] ties the registries, the library aggregator, the
//! module resolver and the suspense coordinator together behind the API the
//! rendering layer and external registrars use.
//!
//! # Example
//!
//! ```
//! use thunderbolt_components_loader::{
//!     AppStructure, Component, ComponentLibrary, ComponentModule, ComponentsLoader,
//!     LoaderConfig, RenderEnv, StructureEntry, loader_fn,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let library = ComponentLibrary::new("site").with_loader(
//!     "Text",
//!     loader_fn(|| async { Ok(ComponentModule::default_export(Component::new("text"))) }),
//! );
//! let loader = ComponentsLoader::builder(LoaderConfig::new(RenderEnv::Server))
//!     .with_registrar(library)
//!     .build();
//!
//! let mut structure = AppStructure::new();
//! structure.insert("comp-1".into(), StructureEntry::new("Text"));
//! structure.insert("comp-2".into(), StructureEntry::new("Unknown"));
//!
//! let report = loader.load_components(&structure).await.unwrap();
//! assert_eq!(report.loaded.len(), 1);
//! assert_eq!(report.missing.len(), 1);
//! assert!(loader.get_component_to_render("Text").is_some());
//! # }
//! ```

use core::fmt;
use std::sync::Arc;

use futures::future::join_all;
use hashbrown::HashMap;
use thunderbolt_core::PhaseLogger;
use tokio::runtime::Handle;

use crate::component::{CompController, Component};
use crate::config::LoaderConfig;
use crate::entry::LoaderFn;
use crate::error::LoaderError;
use crate::gate::{EnvironmentGate, HostReadiness};
use crate::hydration::{HydrationManifest, HydrationState, SuspendedComps};
use crate::key::ComponentTypeKey;
use crate::library::{ComponentLibraries, ComponentsRegistrar, LibraryAggregator};
use crate::navigation::{NavigationManager, NavigationState};
use crate::registry::Registries;
use crate::resolver::ModuleResolver;
use crate::structure::{AppStructure, required_keys};
use crate::suspense::{SuspenseContext, SuspenseCoordinator};
use crate::viewport::{AlwaysVisible, ViewportObserver};
use crate::wrapper::{CompsLifecycle, LifecycleWrapper, MemoWrapper, WrapComponent};

// ─────────────────────────────────────────────────────────────────────────────
// LoadReport
// ─────────────────────────────────────────────────────────────────────────────

/// Per-key outcome of a batch load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Keys resolved into the registry (or already there).
    pub loaded: Vec<ComponentTypeKey>,
    /// Keys without any loader.
    pub missing: Vec<ComponentTypeKey>,
    /// Keys left to their suspense boundaries.
    pub deferred: Vec<ComponentTypeKey>,
    /// Keys whose loader failed.
    pub failed: Vec<(ComponentTypeKey, LoaderError)>,
}

impl LoadReport {
    /// Returns true if no key failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the total number of keys in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len() + self.missing.len() + self.deferred.len() + self.failed.len()
    }

    /// Returns true if the report covers no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, key: ComponentTypeKey, outcome: Result<Option<Component>, LoaderError>) {
        match outcome {
            Ok(Some(_)) => self.loaded.push(key),
            Ok(None) => self.missing.push(key),
            Err(err) => self.failed.push((key, err)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentsLoader
// ─────────────────────────────────────────────────────────────────────────────

/// Loads, caches and hands out component implementations for one page session.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct ComponentsLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    config: LoaderConfig,
    registries: Arc<Registries>,
    resolver: Arc<ModuleResolver>,
    coordinator: SuspenseCoordinator,
}

impl fmt::Debug for ComponentsLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentsLoader")
            .field("env", &self.inner.config.env)
            .field("registries", &self.inner.registries)
            .field("coordinator", &self.inner.coordinator)
            .finish()
    }
}

impl ComponentsLoader {
    /// Starts building a loader.
    #[must_use]
    pub fn builder(config: LoaderConfig) -> ComponentsLoaderBuilder {
        ComponentsLoaderBuilder::new(config)
    }

    /// Returns the configuration the loader was built with.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Returns the registries backing this loader.
    #[must_use]
    pub fn registries(&self) -> &Arc<Registries> {
        &self.inner.registries
    }

    /// Returns the environment gate awaited before loaders run.
    #[must_use]
    pub fn environment_gate(&self) -> &EnvironmentGate {
        self.inner.resolver.gate()
    }

    /// Returns the tracker of instances waiting on suspense boundaries.
    #[must_use]
    pub fn suspended_comps(&self) -> &SuspendedComps {
        &self.inner.coordinator.context().suspended
    }

    /// Resolves a key, loading its module if it is not cached yet.
    ///
    /// Returns `Ok(None)` when no library knows the key.
    ///
    /// # Errors
    ///
    /// Returns an error if library aggregation or the key's loader fails.
    pub async fn resolve(&self, key: impl Into<ComponentTypeKey>) -> Result<Option<Component>, LoaderError> {
        self.inner.resolver.resolve(&key.into()).await
    }

    /// Registers a loader for a component type and resolves it.
    ///
    /// A key that is already resolved is left untouched and its cached
    /// component returned; the given loader is not invoked.
    ///
    /// # Errors
    ///
    /// Returns an error if library aggregation or the loader fails.
    pub async fn register_component(
        &self,
        component_type: &str,
        loader: Option<LoaderFn>,
        ui_type: Option<&str>,
    ) -> Result<Option<Component>, LoaderError> {
        let key = ComponentTypeKey::new(component_type, ui_type);
        self.register_key(key, loader).await
    }

    async fn register_key(
        &self,
        key: ComponentTypeKey,
        loader: Option<LoaderFn>,
    ) -> Result<Option<Component>, LoaderError> {
        if let Some(component) = self.inner.registries.component(key.as_str()) {
            return Ok(Some(component));
        }
        // Libraries merge first so they cannot replace an explicit loader.
        self.inner.resolver.ensure_registered().await?;
        if let Some(loader) = loader {
            self.inner.registries.insert_loader(key.clone(), loader);
        }
        self.inner.resolver.resolve(&key).await
    }

    /// Registers a loader whose key is eligible for viewport deferral.
    ///
    /// On the server the key resolves immediately. On the client only the
    /// loader is stored and resolution is left to the key's suspense
    /// boundary, unless an in-app navigation bypasses deferral.
    ///
    /// # Errors
    ///
    /// Returns an error if library aggregation or an immediate resolution
    /// fails.
    pub async fn register_suspended_component(
        &self,
        component_type: &str,
        loader: LoaderFn,
        ui_type: Option<&str>,
    ) -> Result<Option<Component>, LoaderError> {
        let key = ComponentTypeKey::new(component_type, ui_type);
        self.inner.coordinator.allow(key.clone());

        if !self.inner.coordinator.should_defer(key.as_str()) {
            return self.register_key(key, Some(loader)).await;
        }
        if let Some(component) = self.inner.registries.component(key.as_str()) {
            return Ok(Some(component));
        }
        self.inner.resolver.ensure_registered().await?;
        tracing::debug!(%key, "suspended component registered");
        self.inner.registries.insert_loader(key, loader);
        Ok(None)
    }

    /// Loads every key a page structure requires.
    ///
    /// Keys load concurrently and fail independently; per-key outcomes are
    /// collected in the report. On the client, keys eligible for deferral are
    /// reported as deferred and left to their boundaries.
    ///
    /// # Errors
    ///
    /// Returns an error only if library aggregation fails.
    pub async fn load_components(&self, structure: &AppStructure) -> Result<LoadReport, LoaderError> {
        self.inner.resolver.ensure_registered().await?;
        let report = self.load_keys(required_keys(structure)).await;
        tracing::debug!(
            loaded = report.loaded.len(),
            missing = report.missing.len(),
            deferred = report.deferred.len(),
            failed = report.failed.len(),
            "page components loaded"
        );
        Ok(report)
    }

    /// Loads every key known to the loader registry.
    ///
    /// # Errors
    ///
    /// Returns an error only if library aggregation fails.
    pub async fn load_all_components(&self) -> Result<LoadReport, LoaderError> {
        self.inner.resolver.ensure_registered().await?;
        Ok(self.load_keys(self.inner.registries.loader_keys()).await)
    }

    /// Loads a single component type, honoring deferral.
    ///
    /// Returns `Ok(None)` for unknown and deferred keys.
    ///
    /// # Errors
    ///
    /// Returns an error if library aggregation or the key's loader fails.
    pub async fn load_component(
        &self,
        component_type: &str,
        ui_type: Option<&str>,
    ) -> Result<Option<Component>, LoaderError> {
        self.inner.resolver.ensure_registered().await?;
        let key = ComponentTypeKey::new(component_type, ui_type);
        if self.is_deferred(&key) {
            return Ok(None);
        }
        self.inner.resolver.resolve(&key).await
    }

    async fn load_keys(&self, keys: Vec<ComponentTypeKey>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut pending = Vec::with_capacity(keys.len());
        for key in keys {
            if self.is_deferred(&key) {
                report.deferred.push(key);
            } else {
                pending.push(key);
            }
        }

        let outcomes = join_all(pending.into_iter().map(|key| async move {
            let outcome = self.inner.resolver.resolve(&key).await;
            (key, outcome)
        }))
        .await;

        for (key, outcome) in outcomes {
            if let Err(err) = &outcome {
                tracing::warn!(%key, error = %err, "component failed to load");
            }
            report.record(key, outcome);
        }
        report
    }

    fn is_deferred(&self, key: &ComponentTypeKey) -> bool {
        !self.inner.registries.has_component(key.as_str()) && self.inner.coordinator.should_defer(key.as_str())
    }

    /// Returns the implementation to render for a key.
    ///
    /// Outside the first navigation a cached component is returned as is.
    /// Otherwise an eligible key yields its boundary (a client suspense
    /// boundary, or a server hydration wrapper), and any other key its cached
    /// component. `None` means there is nothing to render yet.
    #[must_use]
    pub fn get_component_to_render(&self, key: &str) -> Option<Component> {
        let cached = self.inner.registries.component(key);
        if cached.is_some() && !self.inner.coordinator.context().navigation.is_first_navigation() {
            return cached;
        }
        self.inner
            .coordinator
            .boundary(&ComponentTypeKey::from(key), cached.as_ref())
            .or(cached)
    }

    /// Wraps a loader in a client suspense boundary that bypasses the registry.
    ///
    /// The boundary resolves its loader once the mounted instance enters the
    /// viewport; the result is returned to the instance but never cached.
    #[must_use]
    pub fn deferred_boundary(&self, label: impl Into<ComponentTypeKey>, loader: LoaderFn) -> Component {
        self.inner.coordinator.loader_boundary(label.into(), loader)
    }

    /// Returns whether a key is eligible for viewport deferral.
    #[must_use]
    pub fn is_suspense_eligible(&self, key: &str) -> bool {
        self.inner.coordinator.is_eligible(key)
    }

    /// Returns the current hydration state of a key.
    #[must_use]
    pub fn hydration_state(&self, key: &str) -> HydrationState {
        let resolved = self.inner.registries.has_component(key);
        self.inner.coordinator.hydration_state(key, resolved)
    }

    /// Returns whether a key's module is being loaded right now.
    #[must_use]
    pub fn is_loading(&self, key: &str) -> bool {
        self.inner.resolver.is_loading(key)
    }

    /// Returns the keys rendered behind server hydration wrappers so far.
    #[must_use]
    pub fn hydration_manifest(&self) -> HydrationManifest {
        self.inner.coordinator.manifest()
    }

    /// Returns a snapshot of the resolved components.
    #[must_use]
    pub fn components_map(&self) -> HashMap<ComponentTypeKey, Component> {
        self.inner.registries.components()
    }

    /// Returns a snapshot of the controllers recorded at resolution time.
    #[must_use]
    pub fn controllers_map(&self) -> HashMap<ComponentTypeKey, CompController> {
        self.inner.registries.controllers()
    }

    /// Returns the controller recorded for a key.
    #[must_use]
    pub fn controller(&self, key: &str) -> Option<CompController> {
        self.inner.registries.controller(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`ComponentsLoader`].
///
/// Every collaborator has a default: fresh registries, a first-navigation
/// [`NavigationState`], the [`AlwaysVisible`] observer, a host readiness that
/// is already signaled, and the wrapper implied by the configuration.
pub struct ComponentsLoaderBuilder {
    config: LoaderConfig,
    registrars: Vec<Arc<dyn ComponentsRegistrar>>,
    libraries: Option<ComponentLibraries>,
    registries: Option<Arc<Registries>>,
    navigation: Option<Arc<dyn NavigationManager>>,
    viewport: Option<Arc<dyn ViewportObserver>>,
    wrapper: Option<Arc<dyn WrapComponent>>,
    lifecycle: Option<Arc<dyn CompsLifecycle>>,
    readiness: Option<HostReadiness>,
    suspended: Option<SuspendedComps>,
    phases: Option<PhaseLogger>,
    runtime: Option<Handle>,
}

impl fmt::Debug for ComponentsLoaderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentsLoaderBuilder")
            .field("config", &self.config)
            .field("registrars", &self.registrars.len())
            .field("libraries", &self.libraries.is_some())
            .finish_non_exhaustive()
    }
}

impl ComponentsLoaderBuilder {
    fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            registrars: Vec::new(),
            libraries: None,
            registries: None,
            navigation: None,
            viewport: None,
            wrapper: None,
            lifecycle: None,
            readiness: None,
            suspended: None,
            phases: None,
            runtime: None,
        }
    }

    /// Adds a library whose loaders are known up front.
    #[must_use]
    pub fn with_registrar(self, registrar: impl ComponentsRegistrar) -> Self {
        self.with_shared_registrar(Arc::new(registrar))
    }

    /// Adds a shared library.
    #[must_use]
    pub fn with_shared_registrar(mut self, registrar: Arc<dyn ComponentsRegistrar>) -> Self {
        self.registrars.push(registrar);
        self
    }

    /// Sets the libraries that are only known asynchronously.
    #[must_use]
    pub fn with_libraries(mut self, libraries: ComponentLibraries) -> Self {
        self.libraries = Some(libraries);
        self
    }

    /// Uses existing registries instead of fresh ones.
    #[must_use]
    pub fn with_registries(mut self, registries: Arc<Registries>) -> Self {
        self.registries = Some(registries);
        self
    }

    /// Sets the navigation state source.
    #[must_use]
    pub fn with_navigation(mut self, navigation: Arc<dyn NavigationManager>) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// Sets the viewport observer used by suspense boundaries.
    #[must_use]
    pub fn with_viewport_observer(mut self, viewport: Arc<dyn ViewportObserver>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Sets the component wrapper, overriding the configured one.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: Arc<dyn WrapComponent>) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    /// Sets the lifecycle observer used when lifecycle wrapping is enabled.
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn CompsLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Sets the host framework readiness signal.
    #[must_use]
    pub fn with_host_readiness(mut self, readiness: HostReadiness) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Shares a suspended-instances tracker with other page features.
    #[must_use]
    pub fn with_suspended_comps(mut self, suspended: SuspendedComps) -> Self {
        self.suspended = Some(suspended);
        self
    }

    /// Sets the phase logger.
    #[must_use]
    pub fn with_phase_logger(mut self, phases: PhaseLogger) -> Self {
        self.phases = Some(phases);
        self
    }

    /// Sets the runtime suspense boundaries spawn their resolutions on.
    ///
    /// Defaults to the runtime `build` is called from, if any.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the loader.
    #[must_use]
    pub fn build(self) -> ComponentsLoader {
        let config = self.config;
        let registries = self.registries.unwrap_or_default();
        let phases = self.phases.unwrap_or_default();

        let wrapper: Arc<dyn WrapComponent> = match (self.wrapper, self.lifecycle) {
            (Some(wrapper), _) => wrapper,
            (None, Some(lifecycle)) if config.new_components_wrapper => {
                Arc::new(LifecycleWrapper::new(lifecycle))
            }
            (None, _) => Arc::new(MemoWrapper),
        };

        let gate = EnvironmentGate::new(
            config.env,
            config.wait_for_host_framework,
            self.readiness.unwrap_or_else(HostReadiness::ready),
        );
        let aggregator = LibraryAggregator::new(
            Arc::clone(&registries),
            self.registrars,
            self.libraries,
            phases,
        );
        let resolver = Arc::new(ModuleResolver::new(
            Arc::clone(&registries),
            aggregator,
            gate,
            wrapper,
        ));

        let context = Arc::new(SuspenseContext {
            resolver: Arc::clone(&resolver),
            navigation: self
                .navigation
                .unwrap_or_else(|| Arc::new(NavigationState::new())),
            viewport: self.viewport.unwrap_or_else(|| Arc::new(AlwaysVisible)),
            suspended: self.suspended.unwrap_or_default(),
            runtime: self.runtime.or_else(|| Handle::try_current().ok()),
            debug_rendering: config.debug_rendering,
        });
        let coordinator = SuspenseCoordinator::new(&config, context);

        tracing::debug!(
            env = ?config.env,
            gate = resolver.gate().is_enforced(),
            lazy_load_compatible = config.lazy_load_compatible,
            "components loader built"
        );

        ComponentsLoader {
            inner: Arc::new(LoaderInner {
                config,
                registries,
                resolver,
                coordinator,
            }),
        }
    }
}
