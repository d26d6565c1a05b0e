//! In-memory component library and widget bundles.

use async_trait::async_trait;
use thunderbolt_components_loader::{
    Component, ComponentLibrary, ComponentModule, LoaderFn, LoaderMap, ModuleError,
    lazy_manifest, loader_fn,
};
use thunderbolt_ooi::{OoiComponent, OoiComponentLoader};

/// Payload of every demo component: the markup it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(pub String);

fn markup_loader(html: &'static str) -> LoaderFn {
    loader_fn(move || async move {
        Ok(ComponentModule::component(Component::new(Markup(html.to_string()))))
    })
}

/// Builds the demo library.
///
/// `Gallery` is only known to the library's lazy manifest.
#[must_use]
pub fn demo_library() -> ComponentLibrary {
    ComponentLibrary::new("demo")
        .with_loader("Header", markup_loader("<header></header>"))
        .with_loader("Text_Rich", markup_loader("<p class=\"rich\"></p>"))
        .with_loader("Image", markup_loader("<img>"))
        .with_loader("RefComponent", markup_loader("<section data-ref></section>"))
        .with_loader("BuilderPathsContainer", markup_loader("<div data-paths></div>"))
        .with_lazy_manifest(lazy_manifest(|| async {
            let mut loaders = LoaderMap::new();
            loaders.insert("Gallery".into(), markup_loader("<div class=\"gallery\"></div>"));
            Ok(loaders)
        }))
}

/// Widget bundles rendering a placeholder element per widget.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoBundles;

#[async_trait]
impl OoiComponentLoader for DemoBundles {
    async fn get_component(&self, widget_id: &str) -> Result<OoiComponent, ModuleError> {
        let markup = Markup(format!("<div data-widget-id=\"{widget_id}\"></div>"));
        Ok(OoiComponent::new(Component::new(markup)))
    }
}
