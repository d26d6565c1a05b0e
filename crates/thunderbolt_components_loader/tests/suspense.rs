//! Integration tests for viewport deferral, navigation bypass and hydration.


use std::sync::Arc;

use test_utils::{
    CountingLoader, Widget, client_config, failing_loader, server_config, settle, structure,
};
use thunderbolt_components_loader::{
    ComponentLibrary, ComponentsLoader, HostReadiness, HydrationManifest, HydrationState,
    IntersectionHub, LoaderConfig, LoaderError, NavigationState, OnEntered, RenderEnv, ViewportObserver,
    ViewportSubscription,
};

fn observed_loader(config: LoaderConfig, hub: &IntersectionHub) -> ComponentsLoader {
    ComponentsLoader::builder(config)
        .with_viewport_observer(Arc::new(hub.clone()))
        .build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT DEFERRAL
// ═══════════════════════════════════════════════════════════════════════════════

/// A suspended key resolves only after its placeholder enters the viewport.
#[tokio::test]
async fn viewport_entry_triggers_resolution() {
    let counter = CountingLoader::new();
    let hub = IntersectionHub::new();
    let loader = observed_loader(client_config(&[]), &hub);

    let registered = loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap();
    assert!(registered.is_none());
    assert_eq!(loader.hydration_state("W"), HydrationState::DeferredAwaitingViewport);

    let boundary = loader.get_component_to_render("W").unwrap();
    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    assert!(loader.suspended_comps().is_waiting("comp-w"));

    settle().await;
    assert_eq!(counter.calls(), 0);
    assert!(!loader.components_map().contains_key("W"));
    assert!(!mount.is_resolved());

    assert_eq!(hub.notify_entered("comp-w"), 1);
    let component = mount.component().await.unwrap().unwrap();

    assert_eq!(component.downcast_ref::<Widget>(), Some(&Widget("w")));
    assert!(loader.components_map().contains_key("W"));
    assert_eq!(loader.hydration_state("W"), HydrationState::Resolved);
    assert!(!loader.suspended_comps().is_waiting("comp-w"));
    assert_eq!(counter.calls(), 1);
}

/// An in-app navigation after the first resolves suspended keys eagerly.
#[tokio::test]
async fn navigation_bypasses_deferral() {
    let counter = CountingLoader::new();
    let hub = IntersectionHub::new();
    let navigation = Arc::new(NavigationState::new());
    navigation.end_navigation();
    navigation.begin_navigation();

    let loader = ComponentsLoader::builder(client_config(&[]))
        .with_viewport_observer(Arc::new(hub.clone()))
        .with_navigation(navigation)
        .build();

    let component = loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(counter.calls(), 1);
    assert_eq!(hub.observed_count(), 0);
    let rendered = loader.get_component_to_render("W").unwrap();
    assert!(rendered.ptr_eq(&component));
}

/// Boundaries mounted during an in-app navigation load without observing.
#[tokio::test]
async fn boundary_mounted_during_navigation_loads_immediately() {
    let counter = CountingLoader::new();
    let hub = IntersectionHub::new();
    let navigation = Arc::new(NavigationState::new());
    let loader = ComponentsLoader::builder(client_config(&["W"]))
        .with_registrar(ComponentLibrary::new("site").with_loader("W", counter.loader("w")))
        .with_viewport_observer(Arc::new(hub.clone()))
        .with_navigation(navigation.clone())
        .build();

    let boundary = loader.get_component_to_render("W").unwrap();
    navigation.end_navigation();
    navigation.begin_navigation();

    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    assert!(!hub.is_observed("comp-w"));
    assert!(mount.component().await.unwrap().is_some());
    assert_eq!(counter.calls(), 1);
}

/// Unmounting before viewport entry tears the observer down and loads nothing.
#[tokio::test]
async fn unmount_before_entry_cancels() {
    let counter = CountingLoader::new();
    let hub = IntersectionHub::new();
    let loader = observed_loader(client_config(&[]), &hub);
    loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap();

    let boundary = loader.get_component_to_render("W").unwrap();
    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    assert!(hub.is_observed("comp-w"));

    drop(mount);
    assert!(!hub.is_observed("comp-w"));
    assert!(!loader.suspended_comps().is_waiting("comp-w"));
    assert_eq!(hub.notify_entered("comp-w"), 0);

    settle().await;
    assert_eq!(counter.calls(), 0);
    assert!(!loader.components_map().contains_key("W"));
}

/// A mount whose observer drops the callback reports cancellation.
#[tokio::test]
async fn torn_down_observer_reports_cancelled() {
    struct Unsupported;

    impl ViewportObserver for Unsupported {
        fn observe(&self, _comp_id: &str, on_entered: OnEntered) -> ViewportSubscription {
            drop(on_entered);
            ViewportSubscription::noop()
        }
    }

    let counter = CountingLoader::new();
    let loader = ComponentsLoader::builder(client_config(&[]))
        .with_viewport_observer(Arc::new(Unsupported))
        .build();
    loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap();

    let boundary = loader.get_component_to_render("W").unwrap();
    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    let err = mount.component().await.unwrap_err();

    assert!(matches!(err, LoaderError::Cancelled { ref key } if key.as_str() == "W"));
    assert_eq!(counter.calls(), 0);
}

/// Unmounting after viewport entry still lets the load fill the cache.
#[tokio::test]
async fn unmount_after_entry_still_populates_cache() {
    let counter = CountingLoader::new();
    let release = HostReadiness::new();
    let hub = IntersectionHub::new();
    let loader = observed_loader(client_config(&[]), &hub);
    loader
        .register_suspended_component("W", counter.blocked_loader("w", release.clone()), None)
        .await
        .unwrap();

    let boundary = loader.get_component_to_render("W").unwrap();
    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    hub.notify_entered("comp-w");
    settle().await;
    assert_eq!(counter.calls(), 1);

    drop(mount);
    release.mark_ready();

    let component = loader.resolve("W").await.unwrap();
    assert!(component.is_some());
    assert_eq!(counter.calls(), 1);
    assert!(loader.components_map().contains_key("W"));
}

/// The boundary for a key is stable across reads.
#[tokio::test]
async fn boundary_is_reused_across_reads() {
    let counter = CountingLoader::new();
    let loader = ComponentsLoader::builder(client_config(&[])).build();
    loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap();

    let first = loader.get_component_to_render("W").unwrap();
    let second = loader.get_component_to_render("W").unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.as_suspense().map(|b| b.key().to_string()).as_deref(), Some("W"));
}

/// A boundary whose module fails stops counting its instance as waiting.
#[tokio::test]
async fn failed_boundary_clears_waiting() {
    let hub = IntersectionHub::new();
    let loader = observed_loader(client_config(&[]), &hub);
    loader
        .register_suspended_component("W", failing_loader("boom"), None)
        .await
        .unwrap();

    let boundary = loader.get_component_to_render("W").unwrap();
    let mount = boundary.as_suspense().unwrap().mount("comp-w");
    assert!(loader.suspended_comps().is_waiting("comp-w"));

    hub.notify_entered("comp-w");
    assert!(mount.component().await.is_err());
    assert!(!loader.suspended_comps().is_waiting("comp-w"));
    assert!(!loader.components_map().contains_key("W"));
}

/// Eligible keys are left to their boundaries by batch loads on the client.
#[tokio::test]
async fn load_components_defers_eligible_keys() {
    let counter = CountingLoader::new();
    let loader = ComponentsLoader::builder(client_config(&["TPAWidget"]))
        .with_registrar(
            ComponentLibrary::new("site")
                .with_loader("TPAWidget", counter.loader("tpa"))
                .with_loader("Text", counter.loader("text")),
        )
        .build();

    let report = loader
        .load_components(&structure(&[("tpa-1", "TPAWidget"), ("text-1", "Text")]))
        .await
        .unwrap();

    assert_eq!(report.deferred.iter().map(ToString::to_string).collect::<Vec<_>>(), vec!["TPAWidget"]);
    assert_eq!(report.loaded.len(), 1);
    assert_eq!(counter.calls(), 1);
    assert!(loader.load_component("TPAWidget", None).await.unwrap().is_none());
}

/// Without lazy hydration support nothing is deferred.
#[tokio::test]
async fn incompatible_environment_never_defers() {
    let counter = CountingLoader::new();
    let config = LoaderConfig::new(RenderEnv::Client).with_viewport_key("W");
    let loader = ComponentsLoader::builder(config)
        .with_registrar(ComponentLibrary::new("site").with_loader("W", counter.loader("w")))
        .build();

    let report = loader.load_components(&structure(&[("w", "W")])).await.unwrap();
    assert_eq!(report.loaded.len(), 1);
    assert!(loader.get_component_to_render("W").unwrap().as_suspense().is_none());
}

/// Hydration state follows the navigation context.
#[tokio::test]
async fn hydration_state_tracks_navigation() {
    let navigation = Arc::new(NavigationState::new());
    let loader = ComponentsLoader::builder(client_config(&["W"]))
        .with_navigation(navigation.clone())
        .build();

    assert_eq!(loader.hydration_state("W"), HydrationState::DeferredAwaitingViewport);
    assert_eq!(loader.hydration_state("Text"), HydrationState::Eager);

    navigation.end_navigation();
    navigation.begin_navigation();
    assert_eq!(loader.hydration_state("W"), HydrationState::Eager);

    navigation.end_navigation();
    assert_eq!(loader.hydration_state("W"), HydrationState::DeferredAwaitingNavigation);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER HYDRATION
// ═══════════════════════════════════════════════════════════════════════════════

/// The server resolves eligible keys and hands their keys to the client.
#[tokio::test]
async fn server_manifest_skips_client_deferral() {
    let server_counter = CountingLoader::new();
    let server = ComponentsLoader::builder(server_config(&["W"]))
        .with_registrar(ComponentLibrary::new("site").with_loader("W", server_counter.loader("w")))
        .build();

    let report = server.load_components(&structure(&[("w", "W")])).await.unwrap();
    assert_eq!(report.loaded.len(), 1);

    let wrapper = server.get_component_to_render("W").unwrap();
    assert_eq!(wrapper.hydration_key().map(ToString::to_string).as_deref(), Some("W"));
    assert_eq!(wrapper.downcast_ref::<Widget>(), Some(&Widget("w")));

    let manifest = server.hydration_manifest();
    assert!(manifest.contains("W"));

    let client_counter = CountingLoader::new();
    let client = ComponentsLoader::builder(client_config(&["W"]).with_server_manifest(&manifest))
        .with_registrar(ComponentLibrary::new("site").with_loader("W", client_counter.loader("w")))
        .build();

    assert_eq!(client.hydration_state("W"), HydrationState::Eager);
    let report = client.load_components(&structure(&[("w", "W")])).await.unwrap();
    assert_eq!(report.loaded.len(), 1);

    let rendered = client.get_component_to_render("W").unwrap();
    assert!(rendered.as_suspense().is_none());
    assert_eq!(client_counter.calls(), 1);
}

/// The hydration wrapper for a key is stable across reads.
#[tokio::test]
async fn hydration_wrapper_is_reused_across_reads() {
    let counter = CountingLoader::new();
    let loader = ComponentsLoader::builder(server_config(&["W"]))
        .with_registrar(ComponentLibrary::new("site").with_loader("W", counter.loader("w")))
        .build();
    loader.resolve("W").await.unwrap();

    let first = loader.get_component_to_render("W").unwrap();
    let second = loader.get_component_to_render("W").unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.hydration_key().map(ToString::to_string).as_deref(), Some("W"));
    assert_eq!(loader.hydration_manifest().len(), 1);
}

/// Keys the server resolved are never deferred on the first client render,
/// even before their eager load settles.
#[tokio::test]
async fn server_resolved_key_gets_no_boundary_before_it_loads() {
    let mut manifest = HydrationManifest::new();
    manifest.insert("W".into());

    let counter = CountingLoader::new();
    let release = HostReadiness::new();
    let loader = ComponentsLoader::builder(client_config(&["W"]).with_server_manifest(&manifest))
        .with_registrar(
            ComponentLibrary::new("site")
                .with_loader("W", counter.blocked_loader("w", release.clone())),
        )
        .build();

    let load = tokio::spawn({
        let loader = loader.clone();
        async move { loader.resolve("W").await }
    });
    settle().await;
    assert!(loader.get_component_to_render("W").is_none());

    release.mark_ready();
    assert!(load.await.unwrap().unwrap().is_some());
    let rendered = loader.get_component_to_render("W").unwrap();
    assert!(rendered.as_suspense().is_none());
    assert_eq!(rendered.downcast_ref::<Widget>(), Some(&Widget("w")));
}

/// Suspended registration resolves immediately on the server.
#[tokio::test]
async fn server_resolves_suspended_registration() {
    let counter = CountingLoader::new();
    let loader = ComponentsLoader::builder(server_config(&[])).build();

    let component = loader
        .register_suspended_component("W", counter.loader("w"), None)
        .await
        .unwrap();

    assert!(component.is_some());
    assert_eq!(counter.calls(), 1);
    assert_eq!(loader.hydration_state("W"), HydrationState::Resolved);
}

/// A loader boundary resolves on entry without touching the registry.
#[tokio::test]
async fn loader_boundary_bypasses_registry() {
    let counter = CountingLoader::new();
    let hub = IntersectionHub::new();
    let loader = observed_loader(client_config(&[]), &hub);

    let boundary = loader.deferred_boundary("ReactComponent_w1", counter.loader("ooi"));
    let mount = boundary.as_suspense().unwrap().mount("w1");
    settle().await;
    assert_eq!(counter.calls(), 0);

    hub.notify_entered("w1");
    let component = mount.component().await.unwrap().unwrap();
    assert_eq!(component.downcast_ref::<Widget>(), Some(&Widget("ooi")));
    assert!(loader.components_map().is_empty());
}
