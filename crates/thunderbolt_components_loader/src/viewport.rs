//! Viewport observation as a cancellable subscription.
//!
//! A suspense boundary subscribes with the id of the placeholder it renders
//! and a one-shot callback. The returned [`ViewportSubscription`] tears the
//! observer down when dropped, whether or not the callback ever fired.

use core::fmt;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::Mutex;

/// Callback fired once, when the observed placeholder enters the viewport.
pub type OnEntered = Box<dyn FnOnce() + Send + 'static>;

/// Source of "entered viewport" signals.
pub trait ViewportObserver: Send + Sync + 'static {
    /// Observes the placeholder of a component instance.
    fn observe(&self, comp_id: &str, on_entered: OnEntered) -> ViewportSubscription;
}

/// Handle of an active viewport observation.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping the subscription stops observing immediately"]
pub struct ViewportSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl fmt::Debug for ViewportSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl ViewportSubscription {
    /// Creates a subscription that runs `unsubscribe` on teardown.
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Creates a subscription with nothing to tear down.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Stops observing now.
    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for ViewportSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observers
// ─────────────────────────────────────────────────────────────────────────────

/// Observer that reports every placeholder as visible immediately.
///
/// Used where viewport observation is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysVisible;

impl ViewportObserver for AlwaysVisible {
    fn observe(&self, _comp_id: &str, on_entered: OnEntered) -> ViewportSubscription {
        on_entered();
        ViewportSubscription::noop()
    }
}

/// Observer driven by explicit intersection notifications.
///
/// The embedding layer forwards intersection events with
/// [`notify_entered`](Self::notify_entered). Each watcher fires at most once
/// and is removed after firing or when its subscription is dropped.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use thunderbolt_components_loader::{IntersectionHub, ViewportObserver};
///
/// let hub = IntersectionHub::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = fired.clone();
/// let _subscription = hub.observe("comp-1", Box::new(move || flag.store(true, Ordering::SeqCst)));
///
/// assert_eq!(hub.notify_entered("comp-1"), 1);
/// assert!(fired.load(Ordering::SeqCst));
/// assert!(!hub.is_observed("comp-1"));
/// ```
#[derive(Clone, Default)]
pub struct IntersectionHub {
    watchers: Arc<Mutex<Watchers>>,
}

#[derive(Default)]
struct Watchers {
    next_id: u64,
    by_comp: HashMap<String, Vec<(u64, OnEntered)>>,
}

impl fmt::Debug for IntersectionHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntersectionHub")
            .field("observed", &self.observed_count())
            .finish()
    }
}

impl IntersectionHub {
    /// Creates a hub with no watchers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports that a placeholder entered the viewport.
    ///
    /// Returns how many watchers fired.
    pub fn notify_entered(&self, comp_id: &str) -> usize {
        let fired = self.watchers.lock().by_comp.remove(comp_id);
        let Some(fired) = fired else {
            return 0;
        };
        let count = fired.len();
        // Callbacks run outside the lock; they may subscribe again.
        for (_, on_entered) in fired {
            on_entered();
        }
        count
    }

    /// Returns whether any watcher is observing a placeholder.
    #[must_use]
    pub fn is_observed(&self, comp_id: &str) -> bool {
        self.watchers.lock().by_comp.contains_key(comp_id)
    }

    /// Returns the number of active watchers.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.watchers.lock().by_comp.values().map(Vec::len).sum()
    }
}

impl ViewportObserver for IntersectionHub {
    fn observe(&self, comp_id: &str, on_entered: OnEntered) -> ViewportSubscription {
        let id = {
            let mut watchers = self.watchers.lock();
            let id = watchers.next_id;
            watchers.next_id += 1;
            watchers
                .by_comp
                .entry(comp_id.to_string())
                .or_default()
                .push((id, on_entered));
            id
        };

        let hub: Weak<Mutex<Watchers>> = Arc::downgrade(&self.watchers);
        let comp_id = comp_id.to_string();
        ViewportSubscription::new(move || {
            let Some(hub) = hub.upgrade() else {
                return;
            };
            let mut watchers = hub.lock();
            if let Some(list) = watchers.by_comp.get_mut(&comp_id) {
                list.retain(|(watcher, _)| *watcher != id);
                if list.is_empty() {
                    watchers.by_comp.remove(&comp_id);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, OnEntered) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (
            count,
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn dropped_subscription_never_fires() {
        let hub = IntersectionHub::new();
        let (count, on_entered) = counter();

        let subscription = hub.observe("comp-1", on_entered);
        assert!(hub.is_observed("comp-1"));
        drop(subscription);

        assert!(!hub.is_observed("comp-1"));
        assert_eq!(hub.notify_entered("comp-1"), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fires_once() {
        let hub = IntersectionHub::new();
        let (count, on_entered) = counter();
        let _subscription = hub.observe("comp-1", on_entered);

        assert_eq!(hub.notify_entered("comp-1"), 1);
        assert_eq!(hub.notify_entered("comp-1"), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_only_removes_own_watcher() {
        let hub = IntersectionHub::new();
        let (first, a) = counter();
        let (second, b) = counter();
        let sub_a = hub.observe("comp-1", a);
        let _sub_b = hub.observe("comp-1", b);

        sub_a.unsubscribe();
        assert_eq!(hub.observed_count(), 1);

        hub.notify_entered("comp-1");
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn always_visible_fires_immediately() {
        let (count, on_entered) = counter();
        let _subscription = AlwaysVisible.observe("comp-1", on_entered);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
