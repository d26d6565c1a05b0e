//! Hydration bookkeeping shared between server and client renders.

use std::sync::Arc;

use hashbrown::HashSet;
use indexmap::IndexSet;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::key::ComponentTypeKey;

/// Resolution state of a component type in the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HydrationState {
    /// Resolved as soon as it is required.
    Eager,
    /// Deferred until a placeholder enters the viewport.
    DeferredAwaitingViewport,
    /// Deferred; resolved by the next in-app navigation render or by the viewport.
    DeferredAwaitingNavigation,
    /// Present in the resolved components registry.
    Resolved,
}

impl HydrationState {
    /// Returns true for both deferred states.
    #[must_use]
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            Self::DeferredAwaitingViewport | Self::DeferredAwaitingNavigation
        )
    }
}

/// Keys the server resolved and rendered behind hydration wrappers.
///
/// Serialized into the page so the client can hydrate these keys immediately
/// on the first navigation instead of deferring them.
///
/// # Example
///
/// ```
/// use thunderbolt_components_loader::HydrationManifest;
///
/// let mut manifest = HydrationManifest::new();
/// manifest.insert("TPAWidget".into());
///
/// let json = serde_json::to_string(&manifest).unwrap();
/// assert_eq!(json, r#"{"resolved":["TPAWidget"]}"#);
///
/// let parsed: HydrationManifest = serde_json::from_str(&json).unwrap();
/// assert!(parsed.contains("TPAWidget"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationManifest {
    #[serde(deserialize_with = "sorted_keys")]
    resolved: IndexSet<ComponentTypeKey>,
}

fn sorted_keys<'de, D>(deserializer: D) -> Result<IndexSet<ComponentTypeKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut keys = IndexSet::<ComponentTypeKey>::deserialize(deserializer)?;
    keys.sort();
    Ok(keys)
}

impl HydrationManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key. Returns false if it was already recorded.
    pub fn insert(&mut self, key: ComponentTypeKey) -> bool {
        self.resolved.insert_sorted(key).1
    }

    /// Returns whether a key was recorded.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.resolved.contains(key)
    }

    /// Iterates over the recorded keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &ComponentTypeKey> {
        self.resolved.iter()
    }

    /// Returns the number of recorded keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Returns true if no key was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Component instances currently waiting on a suspense boundary.
///
/// Cloning is cheap; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct SuspendedComps {
    waiting: Arc<Mutex<HashSet<String>>>,
}

impl SuspendedComps {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an instance as waiting (or no longer waiting).
    pub fn set_is_waiting_suspense(&self, comp_id: &str, waiting: bool) {
        let mut set = self.waiting.lock();
        if waiting {
            set.insert(comp_id.to_string());
        } else {
            set.remove(comp_id);
        }
    }

    /// Returns whether an instance is waiting.
    #[must_use]
    pub fn is_waiting(&self, comp_id: &str) -> bool {
        self.waiting.lock().contains(comp_id)
    }

    /// Returns the number of waiting instances.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.waiting.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_keys_are_sorted_and_unique() {
        let mut manifest = HydrationManifest::new();
        assert!(manifest.insert("b".into()));
        assert!(manifest.insert("a".into()));
        assert!(!manifest.insert("b".into()));

        let keys: Vec<_> = manifest.keys().map(ComponentTypeKey::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn parsed_manifest_is_sorted() {
        let mut manifest: HydrationManifest =
            serde_json::from_str(r#"{"resolved":["b","c","a"]}"#).unwrap();
        manifest.insert("ab".into());

        let keys: Vec<_> = manifest.keys().map(ComponentTypeKey::as_str).collect();
        assert_eq!(keys, vec!["a", "ab", "b", "c"]);
        assert_eq!(
            serde_json::to_string(&manifest).unwrap(),
            r#"{"resolved":["a","ab","b","c"]}"#
        );
    }

    #[test]
    fn suspended_comps_track_waiting_instances() {
        let suspended = SuspendedComps::new();
        suspended.set_is_waiting_suspense("comp-1", true);
        suspended.set_is_waiting_suspense("comp-2", true);
        assert_eq!(suspended.waiting_count(), 2);

        suspended.clone().set_is_waiting_suspense("comp-1", false);
        assert!(!suspended.is_waiting("comp-1"));
        assert!(suspended.is_waiting("comp-2"));
    }

    #[test]
    fn deferred_states() {
        assert!(HydrationState::DeferredAwaitingViewport.is_deferred());
        assert!(HydrationState::DeferredAwaitingNavigation.is_deferred());
        assert!(!HydrationState::Resolved.is_deferred());
    }
}
