//! Site and page configuration of OOI widgets, and the shape a widget
//! bundle resolves to.

use core::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thunderbolt_components_loader::Component;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// One OOI widget instance on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OoiWidgetConfig {
    /// Id of the widget application.
    pub widget_id: String,
    /// Whether the instance lives in a shared section (SOSP).
    #[serde(default)]
    pub is_in_sosp: bool,
}

impl OoiWidgetConfig {
    /// Creates a widget instance outside any shared section.
    #[must_use]
    pub fn new(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            is_in_sosp: false,
        }
    }

    /// Places the instance in a shared section.
    #[must_use]
    pub fn in_sosp(mut self) -> Self {
        self.is_in_sosp = true;
        self
    }
}

/// OOI widgets of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OoiPageConfig {
    /// Widget instances keyed by comp id.
    #[serde(default)]
    pub ooi_components: IndexMap<String, OoiWidgetConfig>,
    /// Pages on which shared-section widgets are shown.
    #[serde(default)]
    pub pages_to_show_sosp: HashMap<String, bool>,
}

impl OoiPageConfig {
    /// Returns whether an instance is displayed on the given page.
    ///
    /// Shared-section instances are only displayed on pages listed in
    /// `pages_to_show_sosp`; every other instance is always displayed.
    #[must_use]
    pub fn is_displayed(&self, widget: &OoiWidgetConfig, page_id: Option<&str>) -> bool {
        if !widget.is_in_sosp {
            return true;
        }
        page_id
            .and_then(|page_id| self.pages_to_show_sosp.get(page_id))
            .is_some_and(|show| *show)
    }

    /// Iterates over the instances displayed on the given page, in page order.
    pub fn displayed_on<'a>(
        &'a self,
        page_id: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a String, &'a OoiWidgetConfig)> + 'a {
        self.ooi_components
            .iter()
            .filter(move |(_, widget)| self.is_displayed(widget, page_id))
    }
}

/// Site-wide data of one widget application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OoiComponentData {
    /// Whether the bundle splits its code with loadable chunks.
    #[serde(default)]
    pub is_loadable: bool,
    /// Error-reporting DSN owned by the widget vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentry_dsn: Option<String>,
}

/// Site-wide OOI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OoiSiteConfig {
    /// Widget data keyed by widget id.
    #[serde(default)]
    pub ooi_components_data: HashMap<String, OoiComponentData>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget bundles
// ─────────────────────────────────────────────────────────────────────────────

/// Chunk namespace a loadable bundle waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadableNamespace {
    /// Global the bundle's chunks register under.
    pub chunk_loading_global: String,
    /// Namespace of the instance, its comp id.
    pub namespace: String,
}

/// Readiness hook of a loadable bundle; completes once its chunks are loaded.
pub type LoadableReady = Arc<dyn Fn(LoadableNamespace) -> BoxFuture<'static, ()> + Send + Sync>;

/// What a widget bundle resolves to.
#[derive(Clone, Default)]
pub struct OoiComponent {
    /// The exported component, if the bundle has one.
    pub component: Option<Component>,
    /// Readiness hook shared with the bundle's own loadable registry.
    pub loadable_ready: Option<LoadableReady>,
    /// Chunk global of the bundle.
    pub chunk_loading_global: Option<String>,
}

impl OoiComponent {
    /// Creates a bundle exporting the given component.
    #[must_use]
    pub fn new(component: Component) -> Self {
        Self {
            component: Some(component),
            ..Self::default()
        }
    }

    /// Creates a bundle that exports nothing.
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Attaches the bundle's loadable readiness hook.
    #[must_use]
    pub fn with_loadable_ready(
        mut self,
        chunk_loading_global: impl Into<String>,
        loadable_ready: LoadableReady,
    ) -> Self {
        self.chunk_loading_global = Some(chunk_loading_global.into());
        self.loadable_ready = Some(loadable_ready);
        self
    }
}

impl fmt::Debug for OoiComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OoiComponent")
            .field("component", &self.component)
            .field("has_loadable_ready", &self.loadable_ready.is_some())
            .field("chunk_loading_global", &self.chunk_loading_global)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> OoiPageConfig {
        let mut config = OoiPageConfig::default();
        config.ooi_components.insert("comp-a".into(), OoiWidgetConfig::new("w-a"));
        config
            .ooi_components
            .insert("comp-b".into(), OoiWidgetConfig::new("w-b").in_sosp());
        config.pages_to_show_sosp.insert("home".into(), true);
        config.pages_to_show_sosp.insert("blog".into(), false);
        config
    }

    fn displayed(config: &OoiPageConfig, page_id: Option<&str>) -> Vec<String> {
        config
            .displayed_on(page_id)
            .map(|(comp_id, _)| comp_id.clone())
            .collect()
    }

    #[test]
    fn sosp_widgets_follow_page_list() {
        let config = page();
        assert_eq!(displayed(&config, Some("home")), ["comp-a", "comp-b"]);
        assert_eq!(displayed(&config, Some("blog")), ["comp-a"]);
        assert_eq!(displayed(&config, Some("about")), ["comp-a"]);
        assert_eq!(displayed(&config, None), ["comp-a"]);
    }

    #[test]
    fn page_config_deserializes() {
        let config: OoiPageConfig = serde_json::from_str(
            r#"{
                "ooiComponents": {
                    "comp-1": { "widgetId": "w-1", "isInSosp": true },
                    "comp-2": { "widgetId": "w-2" }
                },
                "pagesToShowSosp": { "home": true }
            }"#,
        )
        .unwrap();

        assert!(config.ooi_components["comp-1"].is_in_sosp);
        assert!(!config.ooi_components["comp-2"].is_in_sosp);
        assert_eq!(displayed(&config, Some("home")), ["comp-1", "comp-2"]);
    }
}
