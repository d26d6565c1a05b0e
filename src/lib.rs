//! Client runtime core for the Thunderbolt page renderer.
//!
//! Re-exports the Thunderbolt crates for convenience:
//!
//! - [`core`] - tracing setup, phase logging and clocks
//! - [`components_loader`] - lazy component resolution, suspense and hydration
//! - [`ooi`] - out-of-iframe widget registration

/// Ambient infrastructure: tracing, phase logging, clocks.
pub use thunderbolt_core as core;

/// Component loading and suspense/hydration orchestration.
pub use thunderbolt_components_loader as components_loader;

/// Out-of-iframe widget registration.
pub use thunderbolt_ooi as ooi;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use thunderbolt_components_loader::prelude::*;
    pub use thunderbolt_core::{Clock, PhaseLogger, TracingConfig, TracingFormat};
    pub use thunderbolt_ooi::{OoiComponentsRegistrar, OoiPageLoader};
}
