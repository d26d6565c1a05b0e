//! Phase and meter logging.
//!
//! [`PhaseLogger`] times named phases of page preparation (for example,
//! `componentsLibraries` while component libraries are collected) and records
//! named meters with JSON parameters. Every transition is also emitted as a
//! `tracing` event, so the logger works with whatever subscriber is installed.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use thunderbolt_core::PhaseLogger;
//!
//! let logger = PhaseLogger::new();
//!
//! logger.phase_started("componentLoaders");
//! // ... merge loaders ...
//! logger.phase_ended("componentLoaders");
//!
//! logger.meter("components-under-fold", json!({ "compTypesUnderFold": ["TPAWidget"] }));
//!
//! assert_eq!(logger.phases()[0].name, "componentLoaders");
//! assert_eq!(logger.meters()[0].name, "components-under-fold");
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::time::Clock;

/// A completed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    /// Phase name.
    pub name: String,
    /// Time between `phase_started` and `phase_ended`.
    pub duration: Duration,
}

/// A recorded meter.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterRecord {
    /// Meter name.
    pub name: String,
    /// Custom parameters attached to the measurement.
    pub params: serde_json::Value,
}

#[derive(Default)]
struct PhaseState {
    open: HashMap<String, Instant>,
    completed: Vec<PhaseRecord>,
    meters: Vec<MeterRecord>,
}

/// Records timed phases and meters.
///
/// Cloning is cheap; clones share the same records.
#[derive(Clone, Default)]
pub struct PhaseLogger {
    clock: Clock,
    state: Arc<Mutex<PhaseState>>,
}

impl core::fmt::Debug for PhaseLogger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PhaseLogger")
            .field("open", &state.open.keys().collect::<Vec<_>>())
            .field("completed", &state.completed.len())
            .field("meters", &state.meters.len())
            .finish()
    }
}

impl PhaseLogger {
    /// Creates a logger timed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger timed by the given clock.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            state: Arc::default(),
        }
    }

    /// Marks the start of a phase.
    ///
    /// Starting a phase that is already open restarts its timer.
    pub fn phase_started(&self, name: &str) {
        let now = self.clock.now();
        self.state.lock().open.insert(name.to_string(), now);
        tracing::debug!(phase = name, "phase started");
    }

    /// Marks the end of a phase and returns its duration.
    ///
    /// Returns `None` (and records nothing) if the phase was never started.
    pub fn phase_ended(&self, name: &str) -> Option<Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let Some(started) = state.open.remove(name) else {
            tracing::warn!(phase = name, "phase ended without being started");
            return None;
        };
        let duration = now.saturating_duration_since(started);
        state.completed.push(PhaseRecord {
            name: name.to_string(),
            duration,
        });
        drop(state);

        tracing::debug!(phase = name, ?duration, "phase ended");
        Some(duration)
    }

    /// Records a named measurement.
    pub fn meter(&self, name: &str, params: serde_json::Value) {
        tracing::info!(meter = name, params = %params, "meter");
        self.state.lock().meters.push(MeterRecord {
            name: name.to_string(),
            params,
        });
    }

    /// Returns completed phases in completion order.
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseRecord> {
        self.state.lock().completed.clone()
    }

    /// Returns recorded meters in recording order.
    #[must_use]
    pub fn meters(&self) -> Vec<MeterRecord> {
        self.state.lock().meters.clone()
    }

    /// Returns whether a phase has been started and not yet ended.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.state.lock().open.contains_key(name)
    }
}
