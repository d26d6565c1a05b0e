//! Out-of-iframe (OOI) widget registration.
//!
//! Third-party widgets rendered natively on the page ship their component
//! through an [`OoiComponentLoader`]. Before a page mounts, the
//! [`OoiPageLoader`] fetches the component of every widget visible on the
//! page and either registers it with the components loader under
//! `tpaWidgetNative_<widgetId>`, or writes it straight into the widget's
//! props, optionally behind a client suspense boundary.
//!
//! ```text
//! OoiPageConfig ──► SOSP filter ──► OoiComponentLoader ──┬──► ComponentsLoader (registry)
//!                                                        └──► PropsStore (ReactComponent)
//! ```

/// Error types.
pub mod error;

/// Page-will-mount phase for OOI widgets.
pub mod page_loader;

/// Props store the rendering layer reads widget components from.
pub mod props;

/// The `tpaWidgetNative` registrar.
pub mod registrar;

/// Site and page configuration of OOI widgets.
pub mod types;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::OoiError;
    pub use crate::page_loader::{OoiComponentLoader, OoiPageLoader};
    pub use crate::props::{InMemoryPropsStore, PropsStore};
    pub use crate::registrar::{OoiComponentsRegistrar, TPA_WIDGET_NATIVE, TpaWidgetNative};
    pub use crate::types::{
        LoadableNamespace, LoadableReady, OoiComponent, OoiComponentData, OoiPageConfig,
        OoiSiteConfig, OoiWidgetConfig,
    };
}

pub use error::OoiError;
pub use page_loader::{OoiComponentLoader, OoiPageLoader};
pub use props::{InMemoryPropsStore, PropsStore};
pub use registrar::{OoiComponentsRegistrar, TPA_WIDGET_NATIVE, TpaWidgetNative};
pub use types::{
    LoadableNamespace, LoadableReady, OoiComponent, OoiComponentData, OoiPageConfig, OoiSiteConfig,
    OoiWidgetConfig,
};
