//! Host framework readiness gate.
//!
//! Component modules assume the host UI framework is initialized when they are
//! evaluated. On the client, when configured, every resolution waits on a
//! [`HostReadiness`] signal before invoking a loader entry.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::RenderEnv;

/// Externally signaled "host framework ready" flag.
///
/// Cloning is cheap; clones observe the same signal.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::HostReadiness;
///
/// let readiness = HostReadiness::new();
/// assert!(!readiness.is_ready());
///
/// readiness.mark_ready();
/// assert!(readiness.is_ready());
/// ```
#[derive(Clone)]
pub struct HostReadiness {
    sender: Arc<watch::Sender<bool>>,
}

impl core::fmt::Debug for HostReadiness {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostReadiness")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Default for HostReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl HostReadiness {
    /// Creates a signal that is not ready yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a signal that is already ready.
    #[must_use]
    pub fn ready() -> Self {
        let readiness = Self::new();
        readiness.mark_ready();
        readiness
    }

    /// Marks the host framework as ready, releasing every waiter.
    pub fn mark_ready(&self) {
        self.sender.send_replace(true);
    }

    /// Returns whether the host framework is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.sender.borrow()
    }

    /// Waits until the host framework is ready.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}

/// Precondition awaited before any loader entry is invoked.
///
/// Enforced only for client rendering with the gate enabled; otherwise
/// [`wait`](Self::wait) returns immediately.
#[derive(Debug, Clone)]
pub struct EnvironmentGate {
    readiness: Option<HostReadiness>,
}

impl EnvironmentGate {
    /// Creates a gate for the given environment.
    #[must_use]
    pub fn new(env: RenderEnv, enabled: bool, readiness: HostReadiness) -> Self {
        Self {
            readiness: (env.is_client() && enabled).then_some(readiness),
        }
    }

    /// Creates a gate that never blocks.
    #[must_use]
    pub fn open() -> Self {
        Self { readiness: None }
    }

    /// Returns whether the gate is enforced.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.readiness.is_some()
    }

    /// Waits for the host framework if the gate is enforced.
    ///
    /// There is no timeout: if readiness is never signaled, this never returns.
    pub async fn wait(&self) {
        if let Some(readiness) = &self.readiness {
            if !readiness.is_ready() {
                tracing::debug!("waiting for host framework");
            }
            readiness.wait().await;
        }
    }
}
