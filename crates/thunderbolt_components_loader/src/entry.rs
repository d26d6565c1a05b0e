//! Loader entries and manifests.

use core::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::component::ComponentModule;
use crate::error::ModuleError;
use crate::key::ComponentTypeKey;

/// Future produced by invoking a loader entry.
pub type ModuleFuture = BoxFuture<'static, Result<ComponentModule, ModuleError>>;

/// Deferred, zero-argument loader of one component module.
///
/// Invoking the entry starts the (possibly remote) module fetch. Entries may
/// be invoked more than once and are expected to be idempotent.
pub type LoaderFn = Arc<dyn Fn() -> ModuleFuture + Send + Sync>;

/// Loader entries keyed by component type, in registration order.
pub type LoaderMap = IndexMap<ComponentTypeKey, LoaderFn>;

/// Future produced by invoking a lazy manifest.
pub type ManifestFuture = BoxFuture<'static, Result<LoaderMap, ModuleError>>;

/// Deferred fetch of an additional batch of loader entries.
pub type LazyManifest = Arc<dyn Fn() -> ManifestFuture + Send + Sync>;

/// Builds a [`LoaderFn`] from an async closure.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::{Component, ComponentModule, loader_fn};
///
/// let loader = loader_fn(|| async {
///     Ok(ComponentModule::default_export(Component::new("button")))
/// });
/// # let _ = loader;
/// ```
pub fn loader_fn<F, Fut>(load: F) -> LoaderFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ComponentModule, ModuleError>> + Send + 'static,
{
    Arc::new(move || load().boxed())
}

/// Builds a [`LazyManifest`] from an async closure.
pub fn lazy_manifest<F, Fut>(fetch: F) -> LazyManifest
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<LoaderMap, ModuleError>> + Send + 'static,
{
    Arc::new(move || fetch().boxed())
}
