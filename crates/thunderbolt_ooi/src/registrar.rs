//! The `tpaWidgetNative` host component.

use thunderbolt_components_loader::{
    Component, ComponentModule, ComponentsRegistrar, LoaderMap, ModuleError, loader_fn,
};

use crate::props::PropsStore;

/// Component type OOI widgets are registered under.
pub const TPA_WIDGET_NATIVE: &str = "tpaWidgetNative";

/// Host component of a native third-party widget.
///
/// It renders nothing of its own: each instance delegates to the widget
/// component written into its `ReactComponent` prop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TpaWidgetNative;

impl TpaWidgetNative {
    /// Returns the component an instance delegates to.
    ///
    /// A wrapper written into the props is returned as is; the renderer
    /// unwraps it.
    #[must_use]
    pub fn delegate(&self, props: &dyn PropsStore, comp_id: &str) -> Option<Component> {
        props.react_component(comp_id)
    }
}

/// Library exposing the [`TpaWidgetNative`] host component.
#[derive(Debug, Clone, Copy, Default)]
pub struct OoiComponentsRegistrar;

impl ComponentsRegistrar for OoiComponentsRegistrar {
    fn components(&self) -> Result<LoaderMap, ModuleError> {
        let mut loaders = LoaderMap::new();
        loaders.insert(
            TPA_WIDGET_NATIVE.into(),
            loader_fn(|| async { Ok(ComponentModule::component(Component::new(TpaWidgetNative))) }),
        );
        Ok(loaders)
    }

    fn name(&self) -> &str {
        "ooi"
    }
}
