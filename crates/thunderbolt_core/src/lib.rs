//! Core infrastructure for Thunderbolt.
//!
//! This crate provides the ambient pieces every other Thunderbolt crate leans on:
//!
//! - [`TracingConfig`] - Installs the `tracing` subscriber (pretty, compact or JSON)
//! - [`Clock`] - Time provider, mockable through [`ClockProvider`]
//! - [`PhaseLogger`] - Timed phases and named meters, mirrored to `tracing`
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables [`MockClock`] for deterministic time testing
//!
//! # Example
//!
//! ```
//! use thunderbolt_core::{PhaseLogger, TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! TracingConfig::default()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .init();
//!
//! let logger = PhaseLogger::new();
//! logger.phase_started("componentsLibraries");
//! logger.phase_ended("componentsLibraries");
//! assert_eq!(logger.phases().len(), 1);
//! ```

mod phase;
mod time;
mod tracing_config;

pub use phase::{MeterRecord, PhaseLogger, PhaseRecord};
pub use time::{Clock, ClockProvider};
pub use tracing_config::{TracingConfig, TracingFormat};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;
