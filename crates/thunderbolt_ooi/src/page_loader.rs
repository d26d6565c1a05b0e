//! Page-will-mount phase for OOI widgets.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thunderbolt_components_loader::{
    Component, ComponentModule, ComponentTypeKey, ComponentsLoader, LoaderFn, ModuleError,
    loader_fn,
};

use crate::error::OoiError;
use crate::props::PropsStore;
use crate::registrar::TPA_WIDGET_NATIVE;
use crate::types::{
    LoadableNamespace, OoiComponent, OoiComponentData, OoiPageConfig, OoiSiteConfig,
    OoiWidgetConfig,
};

/// Fetches the bundle of a widget application.
///
/// Implemented by the host that knows where widget bundles live.
#[async_trait]
pub trait OoiComponentLoader: Send + Sync + 'static {
    /// Fetches the bundle of a widget.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be fetched.
    async fn get_component(&self, widget_id: &str) -> Result<OoiComponent, ModuleError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// WidgetFetch
// ─────────────────────────────────────────────────────────────────────────────

/// Everything needed to fetch one instance's component, detached from the
/// page loader so it can live inside a registered loader entry.
#[derive(Clone)]
struct WidgetFetch {
    widgets: Arc<dyn OoiComponentLoader>,
    widget_id: String,
    comp_id: String,
    data: OoiComponentData,
    debug_rendering: bool,
}

impl WidgetFetch {
    async fn load(&self) -> Result<Component, ModuleError> {
        if self.debug_rendering {
            tracing::info!(
                widget_id = %self.widget_id,
                comp_id = %self.comp_id,
                "downloading tpaWidgetNative"
            );
        }

        let bundle = self.widgets.get_component(&self.widget_id).await?;
        let Some(component) = bundle.component else {
            let err = OoiError::ComponentNotExported {
                widget_id: self.widget_id.clone(),
            };
            tracing::error!(
                widget_id = %self.widget_id,
                sentry_dsn = ?self.data.sentry_dsn,
                phase = "ooi component resolution",
                error = %err,
                "ooi component resolution failed"
            );
            return Err(ModuleError::new(err));
        };

        // Loadable bundles resolve their own chunks before first render.
        if self.data.is_loadable
            && let (Some(ready), Some(chunk_loading_global)) =
                (bundle.loadable_ready, bundle.chunk_loading_global)
        {
            ready(LoadableNamespace {
                chunk_loading_global,
                namespace: self.comp_id.clone(),
            })
            .await;
        }

        Ok(component)
    }

    fn into_loader(self) -> LoaderFn {
        loader_fn(move || {
            let fetch = self.clone();
            async move { fetch.load().await.map(ComponentModule::default_export) }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OoiPageLoader
// ─────────────────────────────────────────────────────────────────────────────

/// Registers the OOI widgets of a page before it mounts.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use thunderbolt_components_loader::{
///     Component, ComponentsLoader, LoaderConfig, ModuleError, RenderEnv,
/// };
/// use thunderbolt_ooi::{
///     InMemoryPropsStore, OoiComponent, OoiComponentLoader, OoiPageConfig, OoiPageLoader,
///     OoiWidgetConfig, PropsStore,
/// };
///
/// struct Bundles;
///
/// #[async_trait]
/// impl OoiComponentLoader for Bundles {
///     async fn get_component(&self, widget_id: &str) -> Result<OoiComponent, ModuleError> {
///         Ok(OoiComponent::new(Component::new(widget_id.to_string())))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let loader = ComponentsLoader::builder(LoaderConfig::new(RenderEnv::Client)).build();
/// let props = Arc::new(InMemoryPropsStore::new());
///
/// let mut page = OoiPageConfig::default();
/// page.ooi_components.insert("comp-1".into(), OoiWidgetConfig::new("gallery"));
///
/// let widgets = OoiPageLoader::new(loader, Arc::new(Bundles), props.clone())
///     .with_page_config(page)
///     .page_will_mount()
///     .await;
///
/// assert_eq!(widgets, ["gallery"]);
/// assert!(props.react_component("comp-1").is_some());
/// # }
/// ```
pub struct OoiPageLoader {
    components_loader: ComponentsLoader,
    widgets: Arc<dyn OoiComponentLoader>,
    props: Arc<dyn PropsStore>,
    site: OoiSiteConfig,
    page: OoiPageConfig,
    page_id: Option<String>,
}

impl OoiPageLoader {
    /// Creates a page loader with empty site and page configuration.
    #[must_use]
    pub fn new(
        components_loader: ComponentsLoader,
        widgets: Arc<dyn OoiComponentLoader>,
        props: Arc<dyn PropsStore>,
    ) -> Self {
        Self {
            components_loader,
            widgets,
            props,
            site: OoiSiteConfig::default(),
            page: OoiPageConfig::default(),
            page_id: None,
        }
    }

    /// Sets the site-wide widget data.
    #[must_use]
    pub fn with_site_config(mut self, site: OoiSiteConfig) -> Self {
        self.site = site;
        self
    }

    /// Sets the widgets of the page.
    #[must_use]
    pub fn with_page_config(mut self, page: OoiPageConfig) -> Self {
        self.page = page;
        self
    }

    /// Sets the id of the page being mounted.
    #[must_use]
    pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    /// Returns whether a widget is loaded lazily.
    #[must_use]
    pub fn should_suspend(&self, widget_id: &str) -> bool {
        let config = self.components_loader.config();
        config.ooi_lazy_load
            && config.lazy_load_compatible
            && !config.hydration_black_list_widgets.contains(widget_id)
    }

    /// Loads or registers every widget displayed on the page.
    ///
    /// With `ooi_in_components_registry` on, each instance is registered
    /// under `tpaWidgetNative_<widgetId>`, suspended when the widget is
    /// loaded lazily. Otherwise its component is written into the props
    /// store, behind a client suspense boundary when loaded lazily.
    ///
    /// Widgets fail independently: a failure is logged and the widget is
    /// skipped. Returns the widget ids of the displayed instances, in page
    /// order.
    pub async fn page_will_mount(&self) -> Vec<String> {
        let displayed: Vec<(&String, &OoiWidgetConfig)> =
            self.page.displayed_on(self.page_id.as_deref()).collect();

        join_all(
            displayed
                .iter()
                .map(|(comp_id, widget)| self.mount_widget(comp_id, widget)),
        )
        .await;

        tracing::debug!(
            page_id = ?self.page_id,
            widgets = displayed.len(),
            "ooi widgets mounted"
        );
        displayed
            .into_iter()
            .map(|(_, widget)| widget.widget_id.clone())
            .collect()
    }

    async fn mount_widget(&self, comp_id: &str, widget: &OoiWidgetConfig) {
        let fetch = self.fetch(comp_id, widget);
        let widget_id = widget.widget_id.as_str();
        let suspend = self.should_suspend(widget_id);
        let config = self.components_loader.config();

        if config.ooi_in_components_registry {
            let loader = fetch.into_loader();
            let outcome = if suspend {
                self.components_loader
                    .register_suspended_component(TPA_WIDGET_NATIVE, loader, Some(widget_id))
                    .await
            } else {
                self.components_loader
                    .register_component(TPA_WIDGET_NATIVE, Some(loader), Some(widget_id))
                    .await
            };
            if let Err(err) = outcome {
                tracing::warn!(%widget_id, %comp_id, error = %err, "ooi widget registration failed");
            }
        } else if suspend && config.env.is_client() {
            let label = ComponentTypeKey::new(TPA_WIDGET_NATIVE, Some(widget_id));
            let boundary = self
                .components_loader
                .deferred_boundary(label, fetch.into_loader());
            self.props.update_react_component(comp_id, boundary);
        } else {
            match fetch.load().await {
                Ok(component) => self.props.update_react_component(comp_id, component),
                Err(err) => {
                    tracing::warn!(%widget_id, %comp_id, error = %err, "ooi widget not mounted");
                }
            }
        }
    }

    fn fetch(&self, comp_id: &str, widget: &OoiWidgetConfig) -> WidgetFetch {
        WidgetFetch {
            widgets: Arc::clone(&self.widgets),
            widget_id: widget.widget_id.clone(),
            comp_id: comp_id.to_string(),
            data: self
                .site
                .ooi_components_data
                .get(&widget.widget_id)
                .cloned()
                .unwrap_or_default(),
            debug_rendering: self.components_loader.config().debug_rendering,
        }
    }
}

impl fmt::Debug for OoiPageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OoiPageLoader")
            .field("page_id", &self.page_id)
            .field("widgets", &self.page.ooi_components.len())
            .finish_non_exhaustive()
    }
}
