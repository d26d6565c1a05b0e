//! Error types for component loading.
//!
//! An unknown component type is not an error: resolution yields `Ok(None)`.
//! Errors are reserved for loaders and libraries that actually fail.

use core::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::key::ComponentTypeKey;

/// Failure reported by a loader entry, a library or a lazy manifest.
///
/// Cheap to clone so that every awaiter of a shared load observes the same
/// failure.
#[derive(Clone)]
pub struct ModuleError {
    message: String,
    source: Option<Arc<dyn core::error::Error + Send + Sync>>,
}

impl ModuleError {
    /// Creates an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error.
    pub fn new<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl core::error::Error for ModuleError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn core::error::Error + 'static))
    }
}

/// Errors surfaced by the components loader.
#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    /// A component library failed while its loaders were enumerated.
    #[error("component library '{library}' failed: {source}")]
    Library {
        /// Name of the failing library.
        library: String,
        /// Underlying failure.
        source: ModuleError,
    },

    /// A loader entry failed for a specific key.
    #[error("failed to load component '{key}': {source}")]
    Module {
        /// The key whose loader failed.
        key: ComponentTypeKey,
        /// Underlying failure.
        source: ModuleError,
    },

    /// A deferred resolution was torn down before it could start.
    #[error("resolution of component '{key}' was cancelled")]
    Cancelled {
        /// The key whose resolution was cancelled.
        key: ComponentTypeKey,
    },
}

impl LoaderError {
    /// Creates a [`Library`](Self::Library) error.
    pub fn library(library: impl Into<String>, source: ModuleError) -> Self {
        Self::Library {
            library: library.into(),
            source,
        }
    }

    /// Creates a [`Module`](Self::Module) error.
    pub fn module(key: ComponentTypeKey, source: ModuleError) -> Self {
        Self::Module { key, source }
    }

    /// Creates a [`Cancelled`](Self::Cancelled) error.
    pub fn cancelled(key: ComponentTypeKey) -> Self {
        Self::Cancelled { key }
    }

    /// Returns the component key this error concerns, if any.
    #[must_use]
    pub fn key(&self) -> Option<&ComponentTypeKey> {
        match self {
            Self::Library { .. } => None,
            Self::Module { key, .. } | Self::Cancelled { key } => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::error::Error as _;

    #[derive(Debug, Error)]
    #[error("chunk 42 failed to download")]
    struct ChunkError;

    #[test]
    fn module_error_keeps_source() {
        let err = ModuleError::new(ChunkError);
        assert_eq!(err.message(), "chunk 42 failed to download");
        assert!(err.source().is_some());
    }

    #[test]
    fn loader_error_display_names_key() {
        let err = LoaderError::module("Gallery".into(), ModuleError::msg("boom"));
        assert_eq!(err.to_string(), "failed to load component 'Gallery': boom");
        assert_eq!(err.key().map(ComponentTypeKey::as_str), Some("Gallery"));
    }

    #[test]
    fn library_error_has_no_key() {
        let err = LoaderError::library("ooi", ModuleError::msg("bad manifest"));
        assert!(err.key().is_none());
        assert!(err.source().is_some());
    }
}
