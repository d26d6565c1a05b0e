//! Loader configuration.
//!
//! [`LoaderConfig`] is usually derived from the page's [`ViewerModel`] with
//! [`LoaderConfig::from_viewer_model`], and adjusted with the `with_*`
//! builders.
//!
//! # Example
//!
//! ```
//! use thunderbolt_components_loader::{LoaderConfig, RenderEnv, ViewerModel};
//!
//! let model: ViewerModel = serde_json::from_str(r#"{
//!     "requestUrl": "https://site.example/?debugRendering=true",
//!     "react18Compatible": true,
//!     "experiments": {
//!         "specs.thunderbolt.viewport_hydration_extended_react_18": true,
//!         "specs.thunderbolt.reactScriptsBeforeApp": "true"
//!     }
//! }"#).unwrap();
//!
//! let config = LoaderConfig::from_viewer_model(&model, RenderEnv::Client);
//! assert!(config.debug_rendering);
//! assert!(config.lazy_load_compatible);
//! assert!(!config.wait_for_host_framework);
//! assert!(config.viewport_allowlist.contains("TPAWidget"));
//! ```

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::hydration::HydrationManifest;
use crate::key::{ComponentTypeKey, TPA_WIDGET};

/// Experiment that, when on, means host framework scripts load before the app.
pub const EXPERIMENT_REACT_SCRIPTS_BEFORE_APP: &str = "specs.thunderbolt.reactScriptsBeforeApp";
/// Experiment enabling viewport hydration for third-party widgets.
pub const EXPERIMENT_VIEWPORT_HYDRATION: &str =
    "specs.thunderbolt.viewport_hydration_extended_react_18";
/// Experiment routing OOI widgets through the components registry.
pub const EXPERIMENT_OOI_IN_COMPONENTS_REGISTRY: &str = "specs.thunderbolt.ooiInComponentsRegistry";
/// Experiment enabling lazy loading of OOI widgets.
pub const EXPERIMENT_OOI_LAZY_LOAD: &str = "specs.thunderbolt.ooi_lazy_load_components";
/// Experiment enabling the lifecycle-reporting component wrapper.
pub const EXPERIMENT_NEW_COMPONENTS_WRAPPER: &str = "specs.thunderbolt.newComponentsWrapper";

/// Package in which lazy hydration is never used.
const DS_PACKAGE: &str = "thunderbolt-ds";

/// Where the page is being rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEnv {
    /// Server-side rendering: everything resolves eagerly.
    Server,
    /// Client-side rendering and hydration.
    #[default]
    Client,
}

impl RenderEnv {
    /// Returns true for client-side rendering.
    #[must_use]
    pub fn is_client(self) -> bool {
        self == Self::Client
    }
}

/// Value of an experiment flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExperimentValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric flag.
    Number(f64),
    /// String flag (`"true"` and `"false"` are read as booleans).
    Text(String),
}

impl ExperimentValue {
    /// Returns whether the flag counts as on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0,
            Self::Text(value) => !value.is_empty() && value != "false",
        }
    }
}

/// Page-level model the loader configuration is derived from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerModel {
    /// Experiment flags.
    pub experiments: HashMap<String, ExperimentValue>,
    /// URL of the current request.
    pub request_url: String,
    /// Whether the host framework supports lazy hydration.
    pub react18_compatible: bool,
    /// Widgets that must never be lazily hydrated.
    pub react18_hydration_black_list_widgets: Vec<String>,
    /// Name of the package rendering the page.
    pub package_name: Option<String>,
}

impl ViewerModel {
    /// Returns whether an experiment is on.
    #[must_use]
    pub fn experiment(&self, name: &str) -> bool {
        self.experiments
            .get(name)
            .is_some_and(ExperimentValue::is_enabled)
    }
}

/// Configuration of a [`ComponentsLoader`](crate::ComponentsLoader).
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Where the page is rendered.
    pub env: RenderEnv,
    /// Whether client resolutions wait for the host framework to be ready.
    pub wait_for_host_framework: bool,
    /// Whether the running environment supports lazy hydration.
    pub lazy_load_compatible: bool,
    /// Whether suspense boundaries log their progress at info level.
    pub debug_rendering: bool,
    /// Whether OOI widgets go through the components registry.
    pub ooi_in_components_registry: bool,
    /// Whether OOI widgets may be lazily loaded.
    pub ooi_lazy_load: bool,
    /// Whether components are wrapped with lifecycle reporting.
    pub new_components_wrapper: bool,
    /// Keys eligible for viewport-deferred loading.
    pub viewport_allowlist: HashSet<ComponentTypeKey>,
    /// Widgets that must never be lazily hydrated.
    pub hydration_black_list_widgets: HashSet<String>,
    /// Keys the server already resolved for the first navigation.
    pub server_resolved: HashSet<ComponentTypeKey>,
}

impl LoaderConfig {
    /// Creates a configuration with every flag off.
    #[must_use]
    pub fn new(env: RenderEnv) -> Self {
        Self {
            env,
            ..Self::default()
        }
    }

    /// Derives the configuration from a viewer model.
    #[must_use]
    pub fn from_viewer_model(model: &ViewerModel, env: RenderEnv) -> Self {
        let mut viewport_allowlist = HashSet::new();
        if model.experiment(EXPERIMENT_VIEWPORT_HYDRATION) {
            viewport_allowlist.insert(ComponentTypeKey::from(TPA_WIDGET));
        }

        Self {
            env,
            wait_for_host_framework: !model.experiment(EXPERIMENT_REACT_SCRIPTS_BEFORE_APP),
            lazy_load_compatible: model.react18_compatible
                && model.package_name.as_deref() != Some(DS_PACKAGE),
            debug_rendering: model.request_url.contains("debugRendering=true"),
            ooi_in_components_registry: model.experiment(EXPERIMENT_OOI_IN_COMPONENTS_REGISTRY),
            ooi_lazy_load: model.experiment(EXPERIMENT_OOI_LAZY_LOAD),
            new_components_wrapper: model.experiment(EXPERIMENT_NEW_COMPONENTS_WRAPPER),
            viewport_allowlist,
            hydration_black_list_widgets: model
                .react18_hydration_black_list_widgets
                .iter()
                .cloned()
                .collect(),
            server_resolved: HashSet::new(),
        }
    }

    /// Sets whether client resolutions wait for the host framework.
    #[must_use]
    pub fn with_host_framework_gate(mut self, enabled: bool) -> Self {
        self.wait_for_host_framework = enabled;
        self
    }

    /// Sets whether lazy hydration is supported.
    #[must_use]
    pub fn with_lazy_load_compatible(mut self, compatible: bool) -> Self {
        self.lazy_load_compatible = compatible;
        self
    }

    /// Sets whether suspense boundaries log their progress.
    #[must_use]
    pub fn with_debug_rendering(mut self, enabled: bool) -> Self {
        self.debug_rendering = enabled;
        self
    }

    /// Sets whether OOI widgets go through the components registry.
    #[must_use]
    pub fn with_ooi_in_components_registry(mut self, enabled: bool) -> Self {
        self.ooi_in_components_registry = enabled;
        self
    }

    /// Sets whether OOI widgets may be lazily loaded.
    #[must_use]
    pub fn with_ooi_lazy_load(mut self, enabled: bool) -> Self {
        self.ooi_lazy_load = enabled;
        self
    }

    /// Excludes a widget from lazy hydration.
    #[must_use]
    pub fn with_blacklisted_widget(mut self, widget_id: impl Into<String>) -> Self {
        self.hydration_black_list_widgets.insert(widget_id.into());
        self
    }

    /// Adds a key to the viewport allowlist.
    #[must_use]
    pub fn with_viewport_key(mut self, key: impl Into<ComponentTypeKey>) -> Self {
        self.viewport_allowlist.insert(key.into());
        self
    }

    /// Records the keys the server resolved, from its hydration manifest.
    #[must_use]
    pub fn with_server_manifest(mut self, manifest: &HydrationManifest) -> Self {
        self.server_resolved.extend(manifest.keys().cloned());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(experiments: &[(&str, ExperimentValue)]) -> ViewerModel {
        ViewerModel {
            experiments: experiments
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
            react18_compatible: true,
            ..ViewerModel::default()
        }
    }

    #[test]
    fn gate_is_on_unless_scripts_load_first() {
        let config = LoaderConfig::from_viewer_model(&model(&[]), RenderEnv::Client);
        assert!(config.wait_for_host_framework);

        let config = LoaderConfig::from_viewer_model(
            &model(&[(EXPERIMENT_REACT_SCRIPTS_BEFORE_APP, ExperimentValue::Bool(true))]),
            RenderEnv::Client,
        );
        assert!(!config.wait_for_host_framework);
    }

    #[test]
    fn viewport_experiment_allows_tpa_widget() {
        let config = LoaderConfig::from_viewer_model(
            &model(&[(EXPERIMENT_VIEWPORT_HYDRATION, ExperimentValue::Text("true".into()))]),
            RenderEnv::Client,
        );
        assert!(config.viewport_allowlist.contains(TPA_WIDGET));
    }

    #[test]
    fn ds_package_is_never_lazy() {
        let mut model = model(&[]);
        model.package_name = Some("thunderbolt-ds".into());

        let config = LoaderConfig::from_viewer_model(&model, RenderEnv::Client);
        assert!(!config.lazy_load_compatible);
    }

    #[test]
    fn experiment_values() {
        assert!(ExperimentValue::Bool(true).is_enabled());
        assert!(!ExperimentValue::Text("false".into()).is_enabled());
        assert!(ExperimentValue::Text("new".into()).is_enabled());
        assert!(!ExperimentValue::Number(0.0).is_enabled());
    }

    #[test]
    fn viewer_model_deserializes_with_defaults() {
        let model: ViewerModel = serde_json::from_str(r#"{ "requestUrl": "https://a.b" }"#).unwrap();
        assert!(model.experiments.is_empty());
        assert!(!model.react18_compatible);
    }
}
