//! Navigation context consulted by the suspense coordinator.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Read access to the session's navigation state.
pub trait NavigationManager: Send + Sync + 'static {
    /// Returns true while the session is on its initial page load.
    fn is_first_navigation(&self) -> bool;

    /// Returns true while an in-app route change is being rendered.
    fn is_during_navigation(&self) -> bool;
}

/// Navigation state tracked in-process.
///
/// A fresh state represents the first navigation, in progress. Every
/// [`begin_navigation`](Self::begin_navigation) after the first
/// [`end_navigation`](Self::end_navigation) is an in-app navigation.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::{NavigationManager, NavigationState};
///
/// let nav = NavigationState::new();
/// assert!(nav.is_first_navigation());
///
/// nav.end_navigation();
/// nav.begin_navigation();
/// assert!(!nav.is_first_navigation());
/// assert!(nav.is_during_navigation());
/// ```
#[derive(Debug)]
pub struct NavigationState {
    navigations: AtomicUsize,
    during: AtomicBool,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    /// Creates the state of a session that is loading its first page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            navigations: AtomicUsize::new(1),
            during: AtomicBool::new(true),
        }
    }

    /// Creates the state of a session that already finished `count` navigations.
    #[must_use]
    pub fn settled(count: usize) -> Self {
        Self {
            navigations: AtomicUsize::new(count.max(1)),
            during: AtomicBool::new(false),
        }
    }

    /// Starts an in-app navigation.
    pub fn begin_navigation(&self) {
        if !self.during.swap(true, Ordering::AcqRel) {
            self.navigations.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Marks the current navigation as rendered.
    pub fn end_navigation(&self) {
        self.during.store(false, Ordering::Release);
    }

    /// Returns how many navigations the session has started.
    #[must_use]
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::Acquire)
    }
}

impl NavigationManager for NavigationState {
    fn is_first_navigation(&self) -> bool {
        self.navigations() <= 1
    }

    fn is_during_navigation(&self) -> bool {
        self.during.load(Ordering::Acquire)
    }
}
