//! Error types for OOI widget loading.

use thiserror::Error;

/// Errors raised while fetching an OOI widget component.
#[derive(Debug, Clone, Error)]
pub enum OoiError {
    /// The widget bundle loaded but exports no component.
    #[error("component is not exported by widget '{widget_id}'")]
    ComponentNotExported {
        /// Widget whose bundle is missing the export.
        widget_id: String,
    },
}
