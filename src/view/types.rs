//! View types - Callbacks, messages, transitions.
//!
//! Callbacks are `Rc<dyn Fn>` so a class can hand the same handler to every
//! instance and instances can clone handlers into closures.

use std::rc::Rc;

use crate::dom::DomHandle;
use crate::store::Change;
use crate::types::Value;

use super::component::{Component, ComputedScope};

// =============================================================================
// Callback Types
// =============================================================================

/// Lifecycle hook.
pub type HookFn = Rc<dyn Fn(&Component)>;

/// Class method, called by event declarations and by hosts.
pub type MethodFn = Rc<dyn Fn(&Component, &[Value])>;

/// Message receiver. Called on the receiving ancestor.
pub type MessageFn = Rc<dyn Fn(&Component, &Message)>;

/// Computed property. Reads through the scope are tracked as dependencies.
pub type ComputedFn = Rc<dyn Fn(&ComputedScope) -> Value>;

/// Initial data factory.
pub type InitDataFn = Rc<dyn Fn() -> Value>;

/// Component event listener.
pub type EventHandler = Rc<dyn Fn(&Value)>;

/// Data watcher: receives the new value and the triggering change.
pub type WatchFn = Rc<dyn Fn(&Value, &Change)>;

/// Completion callback handed to a leave transition.
pub type Done = Box<dyn FnOnce()>;

// =============================================================================
// Message
// =============================================================================

/// Message delivered by [`Component::dispatch`].
pub struct Message {
    /// Component that dispatched.
    pub target: Component,
    pub name: String,
    pub value: Value,
}

// =============================================================================
// Transition
// =============================================================================

/// Enter/leave animation hooks for a component's root node.
///
/// `leave` must eventually call its completion callback; until then the
/// component stays in the `leaving` phase.
#[derive(Clone, Default)]
pub struct Transition {
    pub enter: Option<Rc<dyn Fn(DomHandle)>>,
    pub leave: Option<Rc<dyn Fn(DomHandle, Done)>>,
}

impl Transition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(mut self, enter: impl Fn(DomHandle) + 'static) -> Self {
        self.enter = Some(Rc::new(enter));
        self
    }

    pub fn on_leave(mut self, leave: impl Fn(DomHandle, Done) + 'static) -> Self {
        self.leave = Some(Rc::new(leave));
        self
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("enter", &self.enter.is_some())
            .field("leave", &self.leave.is_some())
            .finish()
    }
}

// =============================================================================
// Ref Target
// =============================================================================

/// Result of [`Component::ref_`].
#[derive(Clone)]
pub enum RefTarget {
    Element(DomHandle),
    Component(Component),
}

impl RefTarget {
    pub fn as_element(&self) -> Option<DomHandle> {
        match self {
            RefTarget::Element(el) => Some(*el),
            RefTarget::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            RefTarget::Component(c) => Some(c),
            RefTarget::Element(_) => None,
        }
    }
}
