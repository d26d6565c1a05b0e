//! Shared test utilities for `thunderbolt_ooi` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities; not every item is used by every test binary"
)]

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use thunderbolt_components_loader::{Component, LoaderConfig, ModuleError, RenderEnv};
use thunderbolt_ooi::{
    LoadableNamespace, LoadableReady, OoiComponent, OoiComponentLoader, OoiPageConfig,
    OoiWidgetConfig,
};

// ═══════════════════════════════════════════════════════════════════════════════
// BUNDLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload of every component produced by [`FakeBundles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetBundle(pub String);

/// Widget bundles served from memory.
#[derive(Default)]
pub struct FakeBundles {
    calls: AtomicUsize,
    missing: Vec<String>,
    chunk_loading_global: Option<String>,
    ready_calls: Arc<Mutex<Vec<LoadableNamespace>>>,
}

impl FakeBundles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves a bundle without an exported component for this widget.
    pub fn with_missing(mut self, widget_id: &str) -> Self {
        self.missing.push(widget_id.to_string());
        self
    }

    /// Serves loadable bundles with the given chunk global.
    pub fn with_loadable(mut self, chunk_loading_global: &str) -> Self {
        self.chunk_loading_global = Some(chunk_loading_global.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Namespaces the loadable readiness hook was invoked with.
    pub fn ready_calls(&self) -> Vec<LoadableNamespace> {
        self.ready_calls.lock().clone()
    }
}

#[async_trait]
impl OoiComponentLoader for FakeBundles {
    async fn get_component(&self, widget_id: &str) -> Result<OoiComponent, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.missing.iter().any(|missing| missing == widget_id) {
            return Ok(OoiComponent::missing());
        }

        let bundle = OoiComponent::new(Component::new(WidgetBundle(widget_id.to_string())));
        Ok(match &self.chunk_loading_global {
            Some(global) => {
                let ready_calls = Arc::clone(&self.ready_calls);
                let ready: LoadableReady = Arc::new(move |namespace| {
                    ready_calls.lock().push(namespace);
                    async {}.boxed()
                });
                bundle.with_loadable_ready(global.clone(), ready)
            }
            None => bundle,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Client configuration with lazy hydration supported and OOI lazy loading on.
pub fn lazy_client_config() -> LoaderConfig {
    LoaderConfig::new(RenderEnv::Client)
        .with_lazy_load_compatible(true)
        .with_ooi_lazy_load(true)
}

/// Builds a page from `(comp_id, widget_id)` pairs.
pub fn page(widgets: &[(&str, &str)]) -> OoiPageConfig {
    let mut config = OoiPageConfig::default();
    for (comp_id, widget_id) in widgets {
        config
            .ooi_components
            .insert((*comp_id).to_string(), OoiWidgetConfig::new(*widget_id));
    }
    config
}

/// Yields to the scheduler a few times so spawned work can make progress.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
