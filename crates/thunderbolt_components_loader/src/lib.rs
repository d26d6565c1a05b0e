//! Lazy component resolution and suspense/hydration orchestration.
//!
//! `thunderbolt_components_loader` resolves component implementations on
//! demand, across server and client rendering, and keeps them in a
//! page-scoped registry the rendering layer reads from.
//!
//! # Core Concepts
//!
//! - [`ComponentTypeKey`] - identifier of one loader/implementation slot
//! - [`ComponentsRegistrar`] - a library of [`LoaderFn`] entries, with an
//!   optional lazy manifest
//! - [`Registries`] - loader, component and controller maps of a page session
//! - [`ComponentsLoader`] - the public API: registration, batch loading and
//!   [`get_component_to_render`](ComponentsLoader::get_component_to_render)
//! - [`SuspenseBoundary`] - client placeholder resolved on viewport entry
//!
//! # Data Flow
//!
//! ```text
//! libraries ──► loader registry ──► resolver ──► wrapper ──► component registry
//!                  ▲      │ miss                                    │
//!                  └──────┴── lazy manifests (once)                 ▼
//!                                                         get_component_to_render
//! ```
//!
//! Resolution waits for the library merge, then for the [`EnvironmentGate`],
//! before invoking a loader. Concurrent resolutions of a key share a single
//! load, and a resolved component is never replaced.

/// Component handles and module shapes.
pub mod component;

/// Loader configuration and viewer model.
pub mod config;

/// Loader entry and manifest types.
pub mod entry;

/// Error types.
pub mod error;

/// Reporting of component types below the first fold.
pub mod fold;

/// Host framework readiness gate.
pub mod gate;

/// Hydration state, manifest and suspended-instance tracking.
pub mod hydration;

/// Component type keys.
pub mod key;

/// Component libraries and their aggregation.
pub mod library;

/// The public loader API.
pub mod loader;

/// Navigation context.
pub mod navigation;

/// Page-scoped registries.
pub mod registry;

mod resolver;

/// Page structure and required keys.
pub mod structure;

/// Suspense boundaries.
pub mod suspense;

/// Viewport observation.
pub mod viewport;

/// Component wrapping and lifecycle reporting.
pub mod wrapper;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::component::{CompController, Component, ComponentModule, MountGuard};
    pub use crate::config::{ExperimentValue, LoaderConfig, RenderEnv, ViewerModel};
    pub use crate::entry::{LazyManifest, LoaderFn, LoaderMap, lazy_manifest, loader_fn};
    pub use crate::error::{LoaderError, ModuleError};
    pub use crate::fold::{FirstFoldEntry, UnderFoldReport, components_under_fold};
    pub use crate::gate::{EnvironmentGate, HostReadiness};
    pub use crate::hydration::{HydrationManifest, HydrationState, SuspendedComps};
    pub use crate::key::ComponentTypeKey;
    pub use crate::library::{ComponentLibraries, ComponentLibrary, ComponentsRegistrar};
    pub use crate::loader::{ComponentsLoader, ComponentsLoaderBuilder, LoadReport};
    pub use crate::navigation::{NavigationManager, NavigationState};
    pub use crate::structure::{AppStructure, StructureEntry, required_keys};
    pub use crate::suspense::{SuspenseBoundary, SuspenseMount};
    pub use crate::viewport::{
        AlwaysVisible, IntersectionHub, OnEntered, ViewportObserver, ViewportSubscription,
    };
    pub use crate::wrapper::{CompsLifecycle, LifecycleWrapper, MemoWrapper, WrapComponent};
}

// Re-export key types at crate root for convenience
pub use component::{CompController, Component, ComponentModule, MountGuard};
pub use config::{ExperimentValue, LoaderConfig, RenderEnv, ViewerModel};
pub use entry::{LazyManifest, LoaderFn, LoaderMap, ManifestFuture, ModuleFuture, lazy_manifest, loader_fn};
pub use error::{LoaderError, ModuleError};
pub use fold::{
    COMPONENTS_UNDER_FOLD, FirstFoldEntry, UnderFoldReport, components_under_fold,
    report_components_under_fold,
};
pub use gate::{EnvironmentGate, HostReadiness};
pub use hydration::{HydrationManifest, HydrationState, SuspendedComps};
pub use key::ComponentTypeKey;
pub use library::{ComponentLibraries, ComponentLibrary, ComponentsRegistrar};
pub use loader::{ComponentsLoader, ComponentsLoaderBuilder, LoadReport};
pub use navigation::{NavigationManager, NavigationState};
pub use registry::Registries;
pub use structure::{AppStructure, StructureEntry, required_keys};
pub use suspense::{SuspenseBoundary, SuspenseMount};
pub use viewport::{
    AlwaysVisible, IntersectionHub, OnEntered, ViewportObserver, ViewportSubscription,
};
pub use wrapper::{CompsLifecycle, LifecycleWrapper, MemoWrapper, WrapComponent};
