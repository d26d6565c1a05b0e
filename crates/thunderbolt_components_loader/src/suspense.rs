//! Suspense boundaries and the deferral decisions behind them.
//!
//! On the server every key resolves eagerly; eligible keys are rendered
//! behind a hydration wrapper and recorded in the [`HydrationManifest`]. On
//! the client an eligible key is rendered as a [`SuspenseBoundary`] that
//! resolves the real component only once its placeholder enters the
//! viewport, unless an in-app navigation makes deferral pointless.
//!
//! # Boundary lifecycle
//!
//! ```text
//! mount(comp_id) ──► waiting (observer subscribed)
//!                        │ entered viewport
//!                        ▼
//!                    resolving ──► resolved (cached in the registry)
//!
//! drop before entry ──► observer torn down, outcome = Cancelled
//! drop after entry  ──► resolution keeps running and fills the cache
//! ```

use core::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::component::Component;
use crate::config::{LoaderConfig, RenderEnv};
use crate::entry::LoaderFn;
use crate::error::LoaderError;
use crate::hydration::{HydrationManifest, HydrationState, SuspendedComps};
use crate::key::ComponentTypeKey;
use crate::navigation::NavigationManager;
use crate::resolver::{ModuleResolver, Resolution};
use crate::viewport::{ViewportObserver, ViewportSubscription};

// ─────────────────────────────────────────────────────────────────────────────
// SuspenseContext
// ─────────────────────────────────────────────────────────────────────────────

/// Collaborators shared by every boundary of a loader.
pub(crate) struct SuspenseContext {
    pub(crate) resolver: Arc<ModuleResolver>,
    pub(crate) navigation: Arc<dyn NavigationManager>,
    pub(crate) viewport: Arc<dyn ViewportObserver>,
    pub(crate) suspended: SuspendedComps,
    pub(crate) runtime: Option<Handle>,
    pub(crate) debug_rendering: bool,
}

impl SuspenseContext {
    /// Waits for viewport entry, then resolves the boundary's component.
    async fn settle(
        &self,
        key: &ComponentTypeKey,
        entered: Option<oneshot::Receiver<()>>,
        loader: Option<LoaderFn>,
    ) -> Resolution {
        if let Some(entered) = entered {
            entered
                .await
                .map_err(|_| LoaderError::cancelled(key.clone()))?;
        }

        match loader {
            None => self.resolver.resolve(key).await,
            Some(loader) => {
                self.resolver.gate().wait().await;
                let module = loader()
                    .await
                    .map_err(|err| LoaderError::module(key.clone(), err))?;
                Ok(Some(module.into_parts().0.with_display_name(key.clone())))
            }
        }
    }

    /// In-app navigations after the first render their targets eagerly.
    fn navigation_bypass(&self) -> bool {
        self.navigation.is_during_navigation() && !self.navigation.is_first_navigation()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SuspenseBoundary
// ─────────────────────────────────────────────────────────────────────────────

enum BoundarySource {
    Registry(ComponentTypeKey),
    Loader {
        label: ComponentTypeKey,
        loader: LoaderFn,
    },
}

/// Client placeholder that defers resolution until its instance is visible.
///
/// A boundary is shared by every instance of its key; each rendered
/// instance calls [`mount`](Self::mount) with its own comp id.
pub struct SuspenseBoundary {
    source: BoundarySource,
    context: Arc<SuspenseContext>,
}

impl fmt::Debug for SuspenseBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspenseBoundary")
            .field("key", self.key())
            .field("registry", &matches!(self.source, BoundarySource::Registry(_)))
            .finish()
    }
}

impl SuspenseBoundary {
    /// Returns the key this boundary stands in for.
    #[must_use]
    pub fn key(&self) -> &ComponentTypeKey {
        match &self.source {
            BoundarySource::Registry(key) => key,
            BoundarySource::Loader { label, .. } => label,
        }
    }

    /// Mounts one instance of the boundary.
    ///
    /// The instance is recorded as waiting in [`SuspendedComps`] until the
    /// component resolves or the returned mount is dropped. Resolution runs
    /// on the loader's Tokio runtime when one was available at build time;
    /// otherwise it is driven by awaiting [`SuspenseMount::component`].
    pub fn mount(&self, comp_id: &str) -> SuspenseMount {
        let ctx = Arc::clone(&self.context);
        let key = self.key().clone();
        ctx.suspended.set_is_waiting_suspense(comp_id, true);
        if ctx.debug_rendering {
            tracing::info!(%key, comp_id, "suspense boundary mounted");
        }

        let (entered, subscription) = if ctx.navigation_bypass() {
            (None, None)
        } else {
            let (tx, rx) = oneshot::channel();
            let on_entered_key = key.clone();
            let debug_rendering = ctx.debug_rendering;
            let owned_comp_id = comp_id.to_string();
            let subscription = ctx.viewport.observe(
                comp_id,
                Box::new(move || {
                    if debug_rendering {
                        tracing::info!(key = %on_entered_key, comp_id = %owned_comp_id, "entered viewport");
                    }
                    let _ = tx.send(());
                }),
            );
            (Some(rx), Some(subscription))
        };

        let work = self.resolution(key.clone(), comp_id.to_string(), entered);
        let outcome = match &ctx.runtime {
            Some(handle) => {
                let task = handle.spawn(work);
                async move { task.await.unwrap_or_else(|_| Err(LoaderError::cancelled(key))) }.boxed()
            }
            None => work,
        };

        SuspenseMount {
            comp_id: comp_id.to_string(),
            key: self.key().clone(),
            outcome: outcome.shared(),
            subscription,
            context: ctx,
        }
    }

    fn resolution(
        &self,
        key: ComponentTypeKey,
        comp_id: String,
        entered: Option<oneshot::Receiver<()>>,
    ) -> BoxFuture<'static, Resolution> {
        let ctx = Arc::clone(&self.context);
        let loader = match &self.source {
            BoundarySource::Registry(_) => None,
            BoundarySource::Loader { loader, .. } => Some(Arc::clone(loader)),
        };

        async move {
            let settled = ctx.settle(&key, entered, loader).await;

            ctx.suspended.set_is_waiting_suspense(&comp_id, false);
            match &settled {
                Ok(resolved) if ctx.debug_rendering => {
                    tracing::info!(%key, comp_id = %comp_id, found = resolved.is_some(), "suspense boundary hydrated");
                }
                Err(err) => tracing::debug!(%key, comp_id = %comp_id, error = %err, "suspense boundary failed"),
                Ok(_) => {}
            }
            settled
        }
        .boxed()
    }
}

/// One mounted instance of a [`SuspenseBoundary`].
///
/// Dropping the mount unmounts the instance: the viewport observer is torn
/// down and the instance stops counting as waiting. A resolution that
/// already started keeps running and still fills the registry.
pub struct SuspenseMount {
    comp_id: String,
    key: ComponentTypeKey,
    outcome: Shared<BoxFuture<'static, Resolution>>,
    subscription: Option<ViewportSubscription>,
    context: Arc<SuspenseContext>,
}

impl fmt::Debug for SuspenseMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspenseMount")
            .field("comp_id", &self.comp_id)
            .field("key", &self.key)
            .field("observing", &self.subscription.is_some())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl SuspenseMount {
    /// Returns the comp id of the mounted instance.
    #[must_use]
    pub fn comp_id(&self) -> &str {
        &self.comp_id
    }

    /// Waits for the real component.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Cancelled`] if the viewport observer was torn
    /// down before it fired, or the load error of the component.
    pub async fn component(&self) -> Result<Option<Component>, LoaderError> {
        self.outcome.clone().await
    }

    /// Returns the outcome if it is already known, without waiting.
    #[must_use]
    pub fn try_component(&self) -> Option<Result<Option<Component>, LoaderError>> {
        self.outcome.peek().cloned()
    }

    /// Returns true once the boundary's component is in the registry.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.context.resolver.registries().has_component(self.key.as_str())
            || matches!(self.outcome.peek(), Some(Ok(Some(_))))
    }
}

impl Drop for SuspenseMount {
    fn drop(&mut self) {
        self.subscription.take();
        self.context
            .suspended
            .set_is_waiting_suspense(&self.comp_id, false);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SuspenseCoordinator
// ─────────────────────────────────────────────────────────────────────────────

/// Decides, per key, between eager resolution and deferral.
pub(crate) struct SuspenseCoordinator {
    env: RenderEnv,
    lazy_load_compatible: bool,
    allowlist: RwLock<HashSet<ComponentTypeKey>>,
    server_resolved: HashSet<ComponentTypeKey>,
    manifest: Mutex<HydrationManifest>,
    boundaries: Mutex<HashMap<ComponentTypeKey, Component>>,
    context: Arc<SuspenseContext>,
}

impl SuspenseCoordinator {
    pub(crate) fn new(config: &LoaderConfig, context: Arc<SuspenseContext>) -> Self {
        Self {
            env: config.env,
            lazy_load_compatible: config.lazy_load_compatible,
            allowlist: RwLock::new(config.viewport_allowlist.clone()),
            server_resolved: config.server_resolved.clone(),
            manifest: Mutex::new(HydrationManifest::new()),
            boundaries: Mutex::new(HashMap::new()),
            context,
        }
    }

    pub(crate) fn context(&self) -> &Arc<SuspenseContext> {
        &self.context
    }

    /// Adds a key to the viewport allowlist.
    pub(crate) fn allow(&self, key: ComponentTypeKey) {
        self.allowlist.write().insert(key);
    }

    /// Returns whether a key may be rendered behind a boundary.
    pub(crate) fn is_eligible(&self, key: &str) -> bool {
        self.lazy_load_compatible && self.allowlist.read().contains(key)
    }

    /// Returns whether resolving a key should wait for its placeholder.
    pub(crate) fn should_defer(&self, key: &str) -> bool {
        if !self.env.is_client() || !self.is_eligible(key) {
            return false;
        }
        let navigation = &self.context.navigation;
        let first = navigation.is_first_navigation();
        if first && self.server_resolved.contains(key) {
            return false;
        }
        !(navigation.is_during_navigation() && !first)
    }

    pub(crate) fn hydration_state(&self, key: &str, resolved: bool) -> HydrationState {
        if resolved {
            HydrationState::Resolved
        } else if !self.should_defer(key) {
            HydrationState::Eager
        } else if self.context.navigation.is_first_navigation() {
            HydrationState::DeferredAwaitingViewport
        } else {
            HydrationState::DeferredAwaitingNavigation
        }
    }

    /// Returns the boundary to render for a key, if the key needs one.
    pub(crate) fn boundary(&self, key: &ComponentTypeKey, cached: Option<&Component>) -> Option<Component> {
        if !self.is_eligible(key.as_str()) {
            return None;
        }

        match self.env {
            RenderEnv::Server => {
                let cached = cached?;
                self.manifest.lock().insert(key.clone());
                let wrapper = self
                    .boundaries
                    .lock()
                    .entry(key.clone())
                    .or_insert_with(|| Component::hydration(key.clone(), Some(cached.clone())))
                    .clone();
                Some(wrapper)
            }
            RenderEnv::Client => {
                if self.context.navigation.is_first_navigation()
                    && self.server_resolved.contains(key.as_str())
                {
                    return None;
                }
                let boundary = self
                    .boundaries
                    .lock()
                    .entry(key.clone())
                    .or_insert_with(|| {
                        Component::suspense(Arc::new(SuspenseBoundary {
                            source: BoundarySource::Registry(key.clone()),
                            context: Arc::clone(&self.context),
                        }))
                    })
                    .clone();
                Some(boundary)
            }
        }
    }

    /// Builds a boundary around a loader that bypasses the registry.
    pub(crate) fn loader_boundary(&self, label: ComponentTypeKey, loader: LoaderFn) -> Component {
        Component::suspense(Arc::new(SuspenseBoundary {
            source: BoundarySource::Loader { label, loader },
            context: Arc::clone(&self.context),
        }))
    }

    pub(crate) fn manifest(&self) -> HydrationManifest {
        self.manifest.lock().clone()
    }
}

impl fmt::Debug for SuspenseCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspenseCoordinator")
            .field("env", &self.env)
            .field("lazy_load_compatible", &self.lazy_load_compatible)
            .field("allowlist", &self.allowlist.read().len())
            .field("server_resolved", &self.server_resolved.len())
            .finish_non_exhaustive()
    }
}
