//! Component wrapping applied before a resolved component is cached.
//!
//! Every resolved implementation passes through a [`WrapComponent`] exactly
//! once. [`MemoWrapper`] is the default; [`LifecycleWrapper`] additionally
//! reports instance mounts and unmounts to a [`CompsLifecycle`] observer.

use std::sync::Arc;

use crate::component::Component;

/// Capability that turns a raw implementation into a render-ready one.
pub trait WrapComponent: Send + Sync + 'static {
    /// Wraps a component.
    fn wrap(&self, component: Component) -> Component;
}

/// Observer of component instance lifecycles.
pub trait CompsLifecycle: Send + Sync + 'static {
    /// Called when an instance mounts (or its displayed id changes).
    fn notify_comp_did_mount(&self, comp_id: &str, id: &str);

    /// Called when an instance unmounts.
    fn component_did_unmount(&self, comp_id: &str, id: &str);
}

/// Wraps components in a memo boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoWrapper;

impl WrapComponent for MemoWrapper {
    fn wrap(&self, component: Component) -> Component {
        Component::memo(component)
    }
}

/// Wraps components so that mounts are reported to a lifecycle observer.
///
/// The result is memoized as well, so it can replace [`MemoWrapper`].
#[derive(Clone)]
pub struct LifecycleWrapper {
    lifecycle: Arc<dyn CompsLifecycle>,
}

impl core::fmt::Debug for LifecycleWrapper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LifecycleWrapper").finish_non_exhaustive()
    }
}

impl LifecycleWrapper {
    /// Creates a wrapper reporting to the given observer.
    #[must_use]
    pub fn new(lifecycle: Arc<dyn CompsLifecycle>) -> Self {
        Self { lifecycle }
    }
}

impl WrapComponent for LifecycleWrapper {
    fn wrap(&self, component: Component) -> Component {
        Component::memo(Component::with_lifecycle(
            component,
            Arc::clone(&self.lifecycle),
        ))
    }
}
