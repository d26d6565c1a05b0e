//! Module resolution with single-flight loading per key.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::component::Component;
use crate::entry::LoaderFn;
use crate::error::LoaderError;
use crate::gate::EnvironmentGate;
use crate::key::ComponentTypeKey;
use crate::library::LibraryAggregator;
use crate::registry::Registries;
use crate::wrapper::WrapComponent;

/// Outcome of one resolution: `Ok(None)` when no loader exists for the key.
pub(crate) type Resolution = Result<Option<Component>, LoaderError>;

type SharedResolution = Shared<BoxFuture<'static, Resolution>>;

/// Turns keys into cached, wrapped components.
///
/// Concurrent resolutions of the same key share one in-flight load; the
/// entry is dropped once the load settles, so a failed key is retried by the
/// next caller while a successful one is served from the registry.
pub(crate) struct ModuleResolver {
    registries: Arc<Registries>,
    aggregator: LibraryAggregator,
    gate: EnvironmentGate,
    wrapper: Arc<dyn WrapComponent>,
    in_flight: Mutex<HashMap<ComponentTypeKey, SharedResolution>>,
}

impl ModuleResolver {
    pub(crate) fn new(
        registries: Arc<Registries>,
        aggregator: LibraryAggregator,
        gate: EnvironmentGate,
        wrapper: Arc<dyn WrapComponent>,
    ) -> Self {
        Self {
            registries,
            aggregator,
            gate,
            wrapper,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub(crate) fn gate(&self) -> &EnvironmentGate {
        &self.gate
    }

    pub(crate) async fn ensure_registered(&self) -> Result<(), LoaderError> {
        self.aggregator.ensure_registered().await
    }

    /// Returns whether a key is currently being loaded.
    pub(crate) fn is_loading(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Resolves a key, joining an in-flight load if there is one.
    pub(crate) async fn resolve(self: &Arc<Self>, key: &ComponentTypeKey) -> Resolution {
        if let Some(component) = self.registries.component(key.as_str()) {
            return Ok(Some(component));
        }

        let load = {
            let mut in_flight = self.in_flight.lock();
            // A load may have settled between the cache read and the lock.
            if let Some(component) = self.registries.component(key.as_str()) {
                return Ok(Some(component));
            }
            in_flight
                .entry(key.clone())
                .or_insert_with(|| self.start_load(key.clone()))
                .clone()
        };
        load.await
    }

    fn start_load(self: &Arc<Self>, key: ComponentTypeKey) -> SharedResolution {
        let this = Arc::clone(self);
        async move {
            let result = this.load(&key).await;
            this.in_flight.lock().remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    async fn load(&self, key: &ComponentTypeKey) -> Resolution {
        self.aggregator.ensure_registered().await?;

        let Some(loader) = self.aggregator.loader_for(key).await else {
            tracing::debug!(%key, "no loader registered for component");
            return Ok(None);
        };
        self.gate.wait().await;
        self.ingest(key, loader).await.map(Some)
    }

    /// Invokes a loader and stores the normalized, wrapped result.
    async fn ingest(&self, key: &ComponentTypeKey, loader: LoaderFn) -> Result<Component, LoaderError> {
        tracing::debug!(%key, "loading component module");
        let module = loader().await.map_err(|err| {
            tracing::warn!(%key, error = %err, "component module failed to load");
            LoaderError::module(key.clone(), err)
        })?;

        let (component, controller) = module.into_parts();
        if let Some(controller) = controller {
            self.registries.insert_controller(key.clone(), controller);
        }

        let wrapped = self.wrapper.wrap(component.with_display_name(key.clone()));
        let stored = self.registries.insert_component(key.clone(), wrapped);
        tracing::debug!(%key, "component resolved");
        Ok(stored)
    }
}

impl core::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("registries", &self.registries)
            .field("gate", &self.gate)
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{CompController, ComponentModule};
    use crate::entry::loader_fn;
    use crate::error::ModuleError;
    use crate::library::ComponentLibrary;
    use crate::wrapper::MemoWrapper;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use thunderbolt_core::PhaseLogger;

    fn resolver(library: ComponentLibrary) -> Arc<ModuleResolver> {
        let registries = Arc::new(Registries::new());
        let aggregator = LibraryAggregator::new(
            registries.clone(),
            vec![Arc::new(library)],
            None,
            PhaseLogger::new(),
        );
        Arc::new(ModuleResolver::new(
            registries,
            aggregator,
            EnvironmentGate::open(),
            Arc::new(MemoWrapper),
        ))
    }

    #[tokio::test]
    async fn named_module_records_controller_and_display_name() {
        let resolver = resolver(ComponentLibrary::new("site").with_loader(
            "Form",
            loader_fn(|| async {
                Ok(ComponentModule::with_controller(
                    Component::new("form"),
                    CompController::new("form-controller"),
                ))
            }),
        ));

        let component = resolver.resolve(&"Form".into()).await.unwrap().unwrap();
        assert!(component.is_memo());
        assert_eq!(
            component.inner().and_then(Component::display_name).map(ComponentTypeKey::as_str),
            Some("Form")
        );
        assert!(resolver.registries().controller("Form").is_some());
    }

    #[tokio::test]
    async fn unknown_key_is_none() {
        let resolver = resolver(ComponentLibrary::new("empty"));
        assert!(resolver.resolve(&"Ghost".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver = resolver(ComponentLibrary::new("flaky").with_loader(
            "Gallery",
            loader_fn(move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(ModuleError::msg("chunk failed"))
                    } else {
                        Ok(ComponentModule::default_export(Component::new("gallery")))
                    }
                }
            }),
        ));

        let err = resolver.resolve(&"Gallery".into()).await.unwrap_err();
        assert!(matches!(err, LoaderError::Module { .. }));
        assert!(!resolver.is_loading("Gallery"));

        assert!(resolver.resolve(&"Gallery".into()).await.unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_resolutions_share_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver = resolver(ComponentLibrary::new("site").with_loader(
            "Text",
            loader_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::task::yield_now().await;
                    Ok(ComponentModule::default_export(Component::new("text")))
                }
            }),
        ));

        let key = ComponentTypeKey::from("Text");
        let (a, b) = tokio::join!(resolver.resolve(&key), resolver.resolve(&key));
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

        assert!(a.ptr_eq(&b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.registries().components().len(), 1);
    }
}
