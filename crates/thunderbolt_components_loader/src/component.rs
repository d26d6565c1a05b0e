//! Render-ready component handles and the module shapes loaders produce.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::key::ComponentTypeKey;
use crate::suspense::SuspenseBoundary;
use crate::wrapper::CompsLifecycle;

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// An opaque, render-ready component implementation.
///
/// The rendering layer owns the meaning of the payload; this crate only moves
/// handles around, tags them, and wraps them. Cloning is cheap and clones
/// compare equal under [`Component::ptr_eq`], which is what registry
/// memoization relies on.
#[derive(Clone)]
pub struct Component(Arc<ComponentInner>);

struct ComponentInner {
    display_name: Option<ComponentTypeKey>,
    body: Body,
}

#[derive(Clone)]
enum Body {
    Native(Arc<dyn Any + Send + Sync>),
    Memo(Component),
    Lifecycle {
        inner: Component,
        lifecycle: Arc<dyn CompsLifecycle>,
    },
    Suspense(Arc<SuspenseBoundary>),
    Hydration {
        key: ComponentTypeKey,
        inner: Option<Component>,
    },
}

impl Component {
    /// Creates a component from an implementation payload.
    pub fn new<T>(implementation: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::from_body(Body::Native(Arc::new(implementation)))
    }

    /// Wraps a component so the renderer skips re-rendering on equal props.
    #[must_use]
    pub fn memo(inner: Component) -> Self {
        Self::from_body(Body::Memo(inner))
    }

    pub(crate) fn with_lifecycle(inner: Component, lifecycle: Arc<dyn CompsLifecycle>) -> Self {
        Self::from_body(Body::Lifecycle { inner, lifecycle })
    }

    pub(crate) fn suspense(boundary: Arc<SuspenseBoundary>) -> Self {
        Self::from_body(Body::Suspense(boundary))
    }

    pub(crate) fn hydration(key: ComponentTypeKey, inner: Option<Component>) -> Self {
        Self::from_body(Body::Hydration { key, inner })
    }

    fn from_body(body: Body) -> Self {
        Self(Arc::new(ComponentInner {
            display_name: None,
            body,
        }))
    }

    /// Returns a copy of this component tagged with a display name.
    #[must_use]
    pub fn with_display_name(&self, name: ComponentTypeKey) -> Self {
        Self(Arc::new(ComponentInner {
            display_name: Some(name),
            body: self.0.body.clone(),
        }))
    }

    /// Returns the diagnostic display name, if one was applied.
    #[must_use]
    pub fn display_name(&self) -> Option<&ComponentTypeKey> {
        self.0.display_name.as_ref()
    }

    /// Returns true if both handles point at the same implementation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the component this one wraps, if it is a wrapper.
    #[must_use]
    pub fn inner(&self) -> Option<&Component> {
        match &self.0.body {
            Body::Memo(inner) | Body::Lifecycle { inner, .. } => Some(inner),
            Body::Hydration { inner, .. } => inner.as_ref(),
            Body::Native(_) | Body::Suspense(_) => None,
        }
    }

    /// Downcasts to the implementation payload, looking through wrappers.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.0.body {
            Body::Native(payload) => payload.downcast_ref::<T>(),
            Body::Suspense(_) => None,
            _ => self.inner().and_then(Component::downcast_ref::<T>),
        }
    }

    /// Returns the client suspense boundary, if this component is one.
    #[must_use]
    pub fn as_suspense(&self) -> Option<&Arc<SuspenseBoundary>> {
        match &self.0.body {
            Body::Suspense(boundary) => Some(boundary),
            _ => None,
        }
    }

    /// Returns the key recorded by a server hydration wrapper.
    #[must_use]
    pub fn hydration_key(&self) -> Option<&ComponentTypeKey> {
        match &self.0.body {
            Body::Hydration { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Returns true if this component is memoized.
    #[must_use]
    pub fn is_memo(&self) -> bool {
        matches!(self.0.body, Body::Memo(_))
    }

    /// Notifies lifecycle observers that an instance was mounted.
    ///
    /// `id` is the displayed id of the instance and `comp_id` its structure id
    /// when the two differ (repeater items). The returned guard notifies the
    /// unmount when dropped. Components without lifecycle wrappers return a
    /// guard that does nothing.
    pub fn mount(&self, id: &str, comp_id: Option<&str>) -> MountGuard {
        let comp_id = comp_id.unwrap_or(id).to_string();
        let id = id.to_string();
        let mut observers = Vec::new();

        let mut current = Some(self);
        while let Some(component) = current {
            if let Body::Lifecycle { lifecycle, .. } = &component.0.body {
                lifecycle.notify_comp_did_mount(&comp_id, &id);
                observers.push(Arc::clone(lifecycle));
            }
            current = component.inner();
        }

        MountGuard {
            comp_id,
            id,
            observers,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0.body {
            Body::Native(_) => "native",
            Body::Memo(_) => "memo",
            Body::Lifecycle { .. } => "lifecycle",
            Body::Suspense(_) => "suspense",
            Body::Hydration { .. } => "hydration",
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("display_name", &self.0.display_name)
            .field("kind", &self.kind())
            .field("inner", &self.inner())
            .finish()
    }
}

/// Guard for a mounted component instance.
///
/// Dropping the guard notifies `component_did_unmount` on every lifecycle
/// observer that saw the mount, innermost last.
#[must_use = "dropping the guard immediately reports the unmount"]
pub struct MountGuard {
    comp_id: String,
    id: String,
    observers: Vec<Arc<dyn CompsLifecycle>>,
}

impl fmt::Debug for MountGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountGuard")
            .field("comp_id", &self.comp_id)
            .field("id", &self.id)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        for lifecycle in &self.observers {
            lifecycle.component_did_unmount(&self.comp_id, &self.id);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CompController
// ─────────────────────────────────────────────────────────────────────────────

/// Behavior hook shipped alongside a component implementation.
///
/// Opaque to this crate, like [`Component`].
#[derive(Clone)]
pub struct CompController(Arc<dyn Any + Send + Sync>);

impl CompController {
    /// Creates a controller from its payload.
    pub fn new<T>(controller: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(controller))
    }

    /// Downcasts to the controller payload.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns true if both handles point at the same controller.
    #[must_use]
    pub fn ptr_eq(&self, other: &CompController) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CompController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompController").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentModule
// ─────────────────────────────────────────────────────────────────────────────

/// The value a loader entry resolves to.
///
/// Libraries ship two shapes: a module that names its component (and may
/// pair it with a controller), and a module whose default export is the
/// component itself. Both are normalized into a single [`Component`] when
/// the module is ingested.
#[derive(Debug, Clone)]
pub enum ComponentModule {
    /// A module exposing `component` and an optional `controller`.
    Component {
        /// The component implementation.
        component: Component,
        /// Optional controller recorded under the same key.
        controller: Option<CompController>,
    },
    /// A module whose default export is the component implementation.
    Default(Component),
}

impl ComponentModule {
    /// Creates a module with a named component and no controller.
    #[must_use]
    pub fn component(component: Component) -> Self {
        Self::Component {
            component,
            controller: None,
        }
    }

    /// Creates a module with a named component and a controller.
    #[must_use]
    pub fn with_controller(component: Component, controller: CompController) -> Self {
        Self::Component {
            component,
            controller: Some(controller),
        }
    }

    /// Creates a module whose default export is the component.
    #[must_use]
    pub fn default_export(component: Component) -> Self {
        Self::Default(component)
    }

    /// Splits the module into its implementation and optional controller.
    #[must_use]
    pub fn into_parts(self) -> (Component, Option<CompController>) {
        match self {
            Self::Component {
                component,
                controller,
            } => (component, controller),
            Self::Default(component) => (component, None),
        }
    }
}
