//! Renders a page document with Thunderbolt's components loader.
//!
//! A page document carries everything a page session starts from: the
//! viewer model, the page structure, the OOI widgets of the page and the
//! first-fold measurement. Rendering runs the same steps a browser session
//! does:
//!
//! ```text
//! OOI page-will-mount ──► load_components ──► get_component_to_render
//!                                                    │ suspense boundaries
//!                                                    ▼
//!                                          viewport entry ──► hydration
//! ```

mod library;

pub use library::{DemoBundles, Markup, demo_library};

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thunderbolt_components_loader::{
    AppStructure, Component, ComponentTypeKey, ComponentsLoader, FirstFoldEntry,
    HydrationManifest, IntersectionHub, LoadReport, LoaderConfig, LoaderError, RenderEnv,
    UnderFoldReport, ViewerModel, components_under_fold, report_components_under_fold,
};
use thunderbolt_core::{PhaseLogger, PhaseRecord};
use thunderbolt_ooi::{
    InMemoryPropsStore, OoiComponentsRegistrar, OoiPageConfig, OoiPageLoader, OoiSiteConfig,
    PropsStore, TpaWidgetNative,
};

/// The demo page shipped with the binary.
pub const HOME_PAGE: &str = include_str!("../pages/home.json");

/// Everything a page session starts from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageDocument {
    /// Where the page is rendered.
    pub env: RenderEnv,
    /// Id of the page.
    pub page_id: Option<String>,
    /// Viewer model the loader configuration derives from.
    pub viewer_model: ViewerModel,
    /// Component instances of the page.
    pub structure: AppStructure,
    /// Site-wide OOI widget data.
    pub ooi_site: OoiSiteConfig,
    /// OOI widgets of the page.
    pub ooi_page: OoiPageConfig,
    /// First-fold measurement, keyed by comp id.
    pub first_fold: IndexMap<String, FirstFoldEntry>,
}

/// How an instance ended up rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Rendered with a component resolved up front.
    Eager,
    /// Rendered by the server inside a hydration wrapper.
    Hydrated,
    /// Rendered once its placeholder entered the viewport.
    Deferred,
    /// No library knows the instance's type.
    Missing,
    /// The instance's component failed to load.
    Failed,
}

/// One rendered instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInstance {
    /// Structure id of the instance.
    pub comp_id: String,
    /// Key the instance was rendered with.
    pub key: ComponentTypeKey,
    /// How the instance was rendered.
    pub mode: RenderMode,
    /// Markup of the rendered component.
    pub markup: Option<String>,
}

/// Result of rendering a page document.
#[derive(Debug)]
pub struct RenderedPage {
    /// OOI widgets displayed on the page.
    pub widgets: Vec<String>,
    /// Outcome of the page's batch load.
    pub report: LoadReport,
    /// Rendered instances. Deferred instances come last, in viewport order.
    pub instances: Vec<RenderedInstance>,
    /// Component types and widgets below the first fold.
    pub under_fold: UnderFoldReport,
    /// Keys rendered behind server hydration wrappers.
    pub manifest: HydrationManifest,
    /// Phases logged while rendering.
    pub phases: Vec<PhaseRecord>,
}

impl RenderedPage {
    /// Returns the instance rendered for a comp id.
    #[must_use]
    pub fn instance(&self, comp_id: &str) -> Option<&RenderedInstance> {
        self.instances.iter().find(|instance| instance.comp_id == comp_id)
    }
}

fn markup(component: &Component) -> Option<String> {
    component.downcast_ref::<Markup>().map(|markup| markup.0.clone())
}

/// Swaps the OOI host component for the widget written into its props.
fn delegate_widget(component: Component, props: &dyn PropsStore, comp_id: &str) -> Component {
    match component.downcast_ref::<TpaWidgetNative>() {
        Some(host) => host.delegate(props, comp_id).unwrap_or(component),
        None => component,
    }
}

/// Renders a page document, scrolling every deferred instance into view.
///
/// # Errors
///
/// Returns an error if library aggregation fails.
pub async fn render_page(document: &PageDocument) -> Result<RenderedPage, LoaderError> {
    let config = LoaderConfig::from_viewer_model(&document.viewer_model, document.env);
    let hub = IntersectionHub::new();
    let phases = PhaseLogger::new();
    let loader = ComponentsLoader::builder(config)
        .with_registrar(demo_library())
        .with_registrar(OoiComponentsRegistrar)
        .with_viewport_observer(Arc::new(hub.clone()))
        .with_phase_logger(phases.clone())
        .build();

    let props = Arc::new(InMemoryPropsStore::new());
    let mut ooi = OoiPageLoader::new(loader.clone(), Arc::new(DemoBundles), props.clone())
        .with_site_config(document.ooi_site.clone())
        .with_page_config(document.ooi_page.clone());
    if let Some(page_id) = &document.page_id {
        ooi = ooi.with_page_id(page_id.clone());
    }
    let widgets = ooi.page_will_mount().await;

    let report = loader.load_components(&document.structure).await?;

    let mut instances = Vec::with_capacity(document.structure.len());
    let mut mounts = Vec::new();
    for (comp_id, entry) in &document.structure {
        let key = entry.key();
        let Some(component) = loader
            .get_component_to_render(key.as_str())
            .map(|component| delegate_widget(component, props.as_ref(), comp_id))
        else {
            instances.push(RenderedInstance {
                comp_id: comp_id.clone(),
                key,
                mode: RenderMode::Missing,
                markup: None,
            });
            continue;
        };

        if let Some(boundary) = component.as_suspense() {
            mounts.push((comp_id.clone(), key, boundary.mount(comp_id)));
            continue;
        }

        let mode = if component.hydration_key().is_some() {
            RenderMode::Hydrated
        } else {
            RenderMode::Eager
        };
        instances.push(RenderedInstance {
            comp_id: comp_id.clone(),
            key,
            mode,
            markup: markup(&component),
        });
    }

    for (comp_id, key, mount) in mounts {
        hub.notify_entered(&comp_id);
        let (mode, markup) = match mount.component().await {
            Ok(Some(component)) => (RenderMode::Deferred, markup(&component)),
            Ok(None) => (RenderMode::Missing, None),
            Err(err) => {
                tracing::warn!(%comp_id, %key, error = %err, "deferred instance failed");
                (RenderMode::Failed, None)
            }
        };
        instances.push(RenderedInstance {
            comp_id,
            key,
            mode,
            markup,
        });
    }

    let under_fold = components_under_fold(&document.first_fold, &document.structure);
    report_components_under_fold(&phases, &under_fold);

    Ok(RenderedPage {
        widgets,
        report,
        instances,
        under_fold,
        manifest: loader.hydration_manifest(),
        phases: phases.phases(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home(env: RenderEnv) -> PageDocument {
        let mut document: PageDocument = serde_json::from_str(HOME_PAGE).unwrap();
        document.env = env;
        document
    }

    #[tokio::test]
    async fn client_renders_home_page() {
        let page = render_page(&home(RenderEnv::Client)).await.unwrap();

        assert_eq!(page.widgets, ["shop-widget", "contact-form"]);
        assert_eq!(page.instance("header").unwrap().mode, RenderMode::Eager);
        assert_eq!(page.instance("gallery").unwrap().mode, RenderMode::Eager);
        assert_eq!(page.instance("legacy").unwrap().mode, RenderMode::Missing);
        assert_eq!(page.instance("comp-form").unwrap().mode, RenderMode::Eager);

        let shop = page.instance("comp-shop").unwrap();
        assert_eq!(shop.mode, RenderMode::Deferred);
        assert_eq!(
            shop.markup.as_deref(),
            Some("<div data-widget-id=\"shop-widget\"></div>")
        );
        assert!(
            page.report
                .deferred
                .contains(&ComponentTypeKey::from("tpaWidgetNative_shop-widget"))
        );
        assert!(page.manifest.is_empty());
    }

    #[tokio::test]
    async fn server_wraps_deferrable_widgets_for_hydration() {
        let page = render_page(&home(RenderEnv::Server)).await.unwrap();

        assert_eq!(page.instance("comp-shop").unwrap().mode, RenderMode::Hydrated);
        assert!(page.manifest.contains("tpaWidgetNative_shop-widget"));
        assert!(page.report.deferred.is_empty());
    }

    #[tokio::test]
    async fn under_fold_report_follows_structure_keys() {
        let page = render_page(&home(RenderEnv::Client)).await.unwrap();

        let keys: Vec<&str> = page
            .under_fold
            .comp_types_under_fold
            .iter()
            .map(ComponentTypeKey::as_str)
            .collect();
        assert_eq!(keys, ["Gallery", "tpaWidgetNative_shop-widget"]);
        assert_eq!(page.under_fold.widget_ids_under_fold, ["shop-widget"]);
    }
}
