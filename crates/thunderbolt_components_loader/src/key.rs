//! Component type keys.

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Component type that pulls in [`BUILDER_PATHS_CONTAINER`] whenever it is required.
pub const REF_COMPONENT: &str = "RefComponent";

/// Companion of [`REF_COMPONENT`].
pub const BUILDER_PATHS_CONTAINER: &str = "BuilderPathsContainer";

/// Key of the third-party widget host that is eligible for viewport hydration.
pub const TPA_WIDGET: &str = "TPAWidget";

/// Identifier of one loader/implementation slot.
///
/// A key is derived from a declared component type and an optional UI
/// variant: `"Button"` for `("Button", None)`, `"Button_Primary"` for
/// `("Button", Some("Primary"))`. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeKey(Arc<str>);

impl ComponentTypeKey {
    /// Derives the key for a component type and optional UI variant.
    ///
    /// An empty UI variant is treated as absent.
    ///
    /// # Example
    ///
    /// ```
    /// use thunderbolt_components_loader::ComponentTypeKey;
    ///
    /// assert_eq!(ComponentTypeKey::new("Button", None).as_str(), "Button");
    /// assert_eq!(
    ///     ComponentTypeKey::new("tpaWidgetNative", Some("widget-1")).as_str(),
    ///     "tpaWidgetNative_widget-1"
    /// );
    /// ```
    #[must_use]
    pub fn new(component_type: &str, ui_type: Option<&str>) -> Self {
        match ui_type {
            Some(ui_type) if !ui_type.is_empty() => {
                Self(Arc::from(format!("{component_type}_{ui_type}")))
            }
            _ => Self(Arc::from(component_type)),
        }
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ComponentTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ComponentTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentTypeKey {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ComponentTypeKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for ComponentTypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ComponentTypeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for ComponentTypeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ComponentTypeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn key_without_variant_is_component_type() {
        assert_eq!(ComponentTypeKey::new("Section", None).as_str(), "Section");
    }

    #[test]
    fn empty_variant_is_ignored() {
        assert_eq!(ComponentTypeKey::new("Section", Some("")).as_str(), "Section");
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let key = ComponentTypeKey::new("TPAWidget", None);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"TPAWidget\"");

        let back: ComponentTypeKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn borrowed_lookup_by_str() {
        let mut set = hashbrown::HashSet::new();
        set.insert(ComponentTypeKey::from("Button_Primary"));
        assert!(set.contains("Button_Primary"));
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(ty in "[A-Za-z]{1,12}", ui in proptest::option::of("[A-Za-z0-9-]{0,12}")) {
            let a = ComponentTypeKey::new(&ty, ui.as_deref());
            let b = ComponentTypeKey::new(&ty, ui.as_deref());
            prop_assert_eq!(&a, &b);
            prop_assert!(a.as_str().starts_with(&ty));
        }

        #[test]
        fn variant_is_appended_after_underscore(ty in "[A-Za-z]{1,12}", ui in "[A-Za-z0-9]{1,12}") {
            let key = ComponentTypeKey::new(&ty, Some(&ui));
            prop_assert_eq!(key.as_str(), format!("{ty}_{ui}"));
        }
    }
}
