//! Component Registry - Id allocation and back-reference resolution.
//!
//! Manages the identity of live components:
//! - Monotonic id allocation (ids are never reused)
//! - Id → component lookup for owner/parent back references
//! - ReactiveSet of live ids (host effects react to add/remove)
//! - Release callbacks registered per id
//!
//! The registry never keeps a component alive. It stores weak handles; the
//! render tree (parent → child) and the host's mount handle are the only
//! owners. A back reference is just a [`ComponentId`] resolved here, so a
//! disposed owner resolves to `None` instead of dangling.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use spark_signals::ReactiveSet;

use crate::types::ComponentId;
use crate::view::{Component, ComponentInner};

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Map component id to its (weak) node.
    static COMPONENTS: RefCell<HashMap<ComponentId, Weak<ComponentInner>>> =
        RefCell::new(HashMap::new());

    /// Set of currently registered ids.
    /// Using ReactiveSet so host effects that iterate over this set
    /// automatically react when components are added or released.
    static LIVE_IDS: RefCell<ReactiveSet<ComponentId>> = RefCell::new(ReactiveSet::new());

    /// Counter for generating unique ids.
    static ID_COUNTER: RefCell<u64> = const { RefCell::new(0) };

    /// Release callbacks registered per id.
    static RELEASE_CALLBACKS: RefCell<HashMap<ComponentId, Vec<Box<dyn FnOnce()>>>> =
        RefCell::new(HashMap::new());
}

// =============================================================================
// Id Allocation
// =============================================================================

/// Allocate a fresh component id.
pub(crate) fn allocate_id() -> ComponentId {
    ID_COUNTER.with(|counter| {
        let mut counter = counter.borrow_mut();
        *counter += 1;
        ComponentId(*counter)
    })
}

/// Make a component resolvable by id.
pub(crate) fn register_component(component: &Component) {
    let id = component.id();
    COMPONENTS.with(|map| {
        map.borrow_mut().insert(id, Rc::downgrade(component.inner()));
    });
    LIVE_IDS.with(|set| {
        set.borrow_mut().insert(id);
    });
}

/// Forget a component. Runs its release callbacks first.
pub(crate) fn release_component(id: ComponentId) {
    run_release_callbacks(id);

    COMPONENTS.with(|map| {
        map.borrow_mut().remove(&id);
    });
    LIVE_IDS.with(|set| {
        set.borrow_mut().remove(&id);
    });
}

// =============================================================================
// Release Callbacks
// =============================================================================

/// Register a callback to run when the component `id` is released.
pub fn on_release(id: ComponentId, callback: impl FnOnce() + 'static) {
    RELEASE_CALLBACKS.with(|callbacks| {
        callbacks
            .borrow_mut()
            .entry(id)
            .or_default()
            .push(Box::new(callback));
    });
}

fn run_release_callbacks(id: ComponentId) {
    let callbacks = RELEASE_CALLBACKS.with(|callbacks| callbacks.borrow_mut().remove(&id));
    if let Some(callbacks) = callbacks {
        for callback in callbacks {
            callback();
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Resolve an id to a live component.
pub fn get_component(id: ComponentId) -> Option<Component> {
    COMPONENTS.with(|map| {
        map.borrow()
            .get(&id)
            .and_then(Weak::upgrade)
            .map(Component::from_inner)
    })
}

/// Check if an id is currently registered.
pub fn is_registered(id: ComponentId) -> bool {
    LIVE_IDS.with(|set| set.borrow().contains(&id))
}

/// All registered ids.
///
/// Note: This creates a reactive dependency when called from a derived/effect.
pub fn live_components() -> Vec<ComponentId> {
    LIVE_IDS.with(|set| set.borrow().iter().copied().collect())
}

/// Number of registered components.
pub fn live_count() -> usize {
    LIVE_IDS.with(|set| set.borrow().len())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Reset all registry state (for testing).
///
/// Ids keep counting up so handles from before the reset never alias.
pub fn reset_registry() {
    COMPONENTS.with(|map| map.borrow_mut().clear());
    LIVE_IDS.with(|set| set.borrow_mut().clear());
    RELEASE_CALLBACKS.with(|callbacks| callbacks.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::view::{ComponentClass, ComponentOptions, TemplateNode};

    fn make() -> Component {
        let class = ComponentClass::builder("x-node")
            .template(TemplateNode::element("div"))
            .build();
        Component::new(&class, ComponentOptions::default()).unwrap()
    }

    #[test]
    fn test_allocate_id_is_monotonic() {
        let a = allocate_id();
        let b = allocate_id();
        assert!(b > a);
    }

    #[test]
    fn test_register_and_lookup() {
        reset_registry();

        let component = make();
        let id = component.id();
        assert!(is_registered(id));
        assert_eq!(live_count(), 1);
        assert!(get_component(id).is_some_and(|c| c.ptr_eq(&component)));
        assert_eq!(live_components(), vec![id]);
    }

    #[test]
    fn test_lookup_does_not_keep_alive() {
        reset_registry();

        let id = {
            let component = make();
            component.id()
        };
        assert!(get_component(id).is_none());
    }

    #[test]
    fn test_live_ids_follow_register_and_release() {
        reset_registry();

        let a = make();
        let b = make();
        let mut live = live_components();
        live.sort();
        assert_eq!(live, vec![a.id(), b.id()]);

        release_component(a.id());
        assert_eq!(live_components(), vec![b.id()]);
        assert_eq!(live_count(), 1);

        reset_registry();
        assert!(live_components().is_empty());
        assert!(!is_registered(b.id()));
    }

    #[test]
    fn test_release_callback() {
        reset_registry();

        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let component = make();
        on_release(component.id(), move || called_clone.set(true));

        assert!(!called.get());
        release_component(component.id());
        assert!(called.get());
        assert!(!is_registered(component.id()));
    }
}
