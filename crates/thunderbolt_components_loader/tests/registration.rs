//! Integration tests for registration, batch loading and the render read path.


use std::sync::Arc;

use parking_lot::Mutex;
use test_utils::{CountingLoader, Widget, client_config, failing_loader, server_config, structure};
use thunderbolt_components_loader::{
    CompController, Component, ComponentLibrary, ComponentModule, ComponentsLoader,
    ComponentsRegistrar, CompsLifecycle, LoaderConfig, LoaderError, LoaderMap, ModuleError,
    RenderEnv, loader_fn,
};

fn loader_with(library: ComponentLibrary, config: LoaderConfig) -> ComponentsLoader {
    ComponentsLoader::builder(config)
        .with_registrar(library)
        .build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Registering the same key twice invokes the loader once.
#[tokio::test]
async fn register_component_is_idempotent() {
    let counter = CountingLoader::new();
    let loader = loader_with(ComponentLibrary::new("empty"), client_config(&[]));

    let first = loader
        .register_component("Gallery", Some(counter.loader("gallery")), None)
        .await
        .unwrap()
        .unwrap();
    let second = loader
        .register_component("Gallery", Some(counter.loader("other")), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(counter.calls(), 1);
    assert!(first.ptr_eq(&second));
    assert_eq!(second.downcast_ref::<Widget>(), Some(&Widget("gallery")));
}

/// The UI variant becomes part of the registered key.
#[tokio::test]
async fn register_component_uses_ui_variant_key() {
    let counter = CountingLoader::new();
    let loader = loader_with(ComponentLibrary::new("empty"), client_config(&[]));

    loader
        .register_component("tpaWidgetNative", Some(counter.loader("native")), Some("widget-7"))
        .await
        .unwrap();

    assert!(loader.components_map().contains_key("tpaWidgetNative_widget-7"));
    assert!(loader.get_component_to_render("tpaWidgetNative").is_none());
}

/// Registering without a loader resolves from the libraries.
#[tokio::test]
async fn register_component_without_loader_uses_library() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site").with_loader("Text", counter.loader("text")),
        client_config(&[]),
    );

    let component = loader.register_component("Text", None, None).await.unwrap();
    assert!(component.is_some());

    let unknown = loader.register_component("Ghost", None, None).await.unwrap();
    assert!(unknown.is_none());
}

/// An explicit loader wins over a library entry for the same key.
#[tokio::test]
async fn explicit_loader_overrides_library_entry() {
    let library = CountingLoader::new();
    let explicit = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site").with_loader("Text", library.loader("library")),
        client_config(&[]),
    );

    let component = loader
        .register_component("Text", Some(explicit.loader("explicit")), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(component.downcast_ref::<Widget>(), Some(&Widget("explicit")));
    assert_eq!(library.calls(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH LOADING
// ═══════════════════════════════════════════════════════════════════════════════

/// Known keys load, unknown keys are reported missing, and nothing fails.
#[tokio::test]
async fn load_components_skips_unknown_types() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site")
            .with_loader("A", counter.loader("a"))
            .with_loader("B", counter.loader("b")),
        client_config(&[]),
    );

    let report = loader
        .load_components(&structure(&[("1", "A"), ("2", "B"), ("3", "C"), ("4", "A")]))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.loaded.len(), 2);
    assert_eq!(report.missing.iter().map(ToString::to_string).collect::<Vec<_>>(), vec!["C"]);
    assert!(loader.get_component_to_render("A").is_some());
    assert!(loader.get_component_to_render("B").is_some());
    assert!(loader.get_component_to_render("C").is_none());
    assert_eq!(counter.calls(), 2);
}

/// One failing key does not prevent its siblings from loading.
#[tokio::test]
async fn failures_are_isolated_per_key() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site")
            .with_loader("Good", counter.loader("good"))
            .with_loader("Bad", failing_loader("chunk 404")),
        client_config(&[]),
    );

    let report = loader
        .load_components(&structure(&[("1", "Bad"), ("2", "Good")]))
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.loaded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    let (key, err) = &report.failed[0];
    assert_eq!(key.as_str(), "Bad");
    assert!(matches!(err, LoaderError::Module { .. }));
    assert!(loader.get_component_to_render("Good").is_some());
}

/// A library that cannot enumerate its loaders fails the whole batch.
#[tokio::test]
async fn broken_library_fails_batch() {
    struct Broken;

    impl ComponentsRegistrar for Broken {
        fn components(&self) -> Result<LoaderMap, ModuleError> {
            Err(ModuleError::msg("bundle missing"))
        }
    }

    let loader = ComponentsLoader::builder(client_config(&[]))
        .with_registrar(Broken)
        .build();

    let err = loader
        .load_components(&structure(&[("1", "Text")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::Library { .. }));
}

/// `load_all_components` resolves every known key.
#[tokio::test]
async fn load_all_components_resolves_every_loader() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site")
            .with_loader("A", counter.loader("a"))
            .with_loader("B", counter.loader("b"))
            .with_loader("C", counter.loader("c")),
        LoaderConfig::new(RenderEnv::Server),
    );

    let report = loader.load_all_components().await.unwrap();
    assert_eq!(report.loaded.len(), 3);
    assert_eq!(loader.components_map().len(), 3);
}

/// A `RefComponent` on the page also loads `BuilderPathsContainer`.
#[tokio::test]
async fn ref_component_loads_builder_paths_container() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site")
            .with_loader("RefComponent", counter.loader("ref"))
            .with_loader("BuilderPathsContainer", counter.loader("paths")),
        client_config(&[]),
    );

    loader
        .load_components(&structure(&[("ref-1", "RefComponent")]))
        .await
        .unwrap();
    assert!(loader.components_map().contains_key("BuilderPathsContainer"));
}

/// `load_component` derives the key from type and variant.
#[tokio::test]
async fn load_component_single_key() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site").with_loader("Button_Primary", counter.loader("primary")),
        client_config(&[]),
    );

    let component = loader.load_component("Button", Some("Primary")).await.unwrap();
    assert_eq!(
        component.and_then(|c| c.downcast_ref::<Widget>().cloned()),
        Some(Widget("primary"))
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER READ PATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved components are returned identically on every read.
#[tokio::test]
async fn get_component_to_render_is_memoized() {
    let counter = CountingLoader::new();
    let loader = loader_with(
        ComponentLibrary::new("site").with_loader("Text", counter.loader("text")),
        client_config(&[]),
    );
    loader.load_components(&structure(&[("1", "Text")])).await.unwrap();

    let first = loader.get_component_to_render("Text").unwrap();
    let second = loader.get_component_to_render("Text").unwrap();
    assert!(first.ptr_eq(&second));
    assert!(first.is_memo());
    assert_eq!(
        first.inner().and_then(Component::display_name).map(ToString::to_string).as_deref(),
        Some("Text")
    );
}

/// Named modules contribute their controllers.
#[tokio::test]
async fn controllers_are_recorded() {
    let loader = loader_with(
        ComponentLibrary::new("site").with_loader(
            "Form",
            loader_fn(|| async {
                Ok(ComponentModule::with_controller(
                    Component::new(Widget("form")),
                    CompController::new(42_u32),
                ))
            }),
        ),
        server_config(&[]),
    );
    loader.load_components(&structure(&[("1", "Form")])).await.unwrap();

    assert_eq!(
        loader.controller("Form").and_then(|c| c.downcast_ref::<u32>().copied()),
        Some(42)
    );
    assert_eq!(loader.controllers_map().len(), 1);
}

#[derive(Default)]
struct RecordingLifecycle {
    events: Mutex<Vec<String>>,
}

impl CompsLifecycle for RecordingLifecycle {
    fn notify_comp_did_mount(&self, comp_id: &str, id: &str) {
        self.events.lock().push(format!("mount {comp_id} {id}"));
    }

    fn component_did_unmount(&self, comp_id: &str, id: &str) {
        self.events.lock().push(format!("unmount {comp_id} {id}"));
    }
}

/// With the new wrapper enabled, mounts are reported to the lifecycle observer.
#[tokio::test]
async fn lifecycle_wrapper_reports_mounts() {
    let counter = CountingLoader::new();
    let lifecycle = Arc::new(RecordingLifecycle::default());
    let mut config = client_config(&[]);
    config.new_components_wrapper = true;

    let loader = ComponentsLoader::builder(config)
        .with_registrar(ComponentLibrary::new("site").with_loader("Text", counter.loader("text")))
        .with_lifecycle(lifecycle.clone())
        .build();
    loader.load_components(&structure(&[("1", "Text")])).await.unwrap();

    let component = loader.get_component_to_render("Text").unwrap();
    drop(component.mount("1", None));

    assert_eq!(*lifecycle.events.lock(), vec!["mount 1 1", "unmount 1 1"]);
}
