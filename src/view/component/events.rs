//! Component events and upward messages.
//!
//! - `on` / `un` / `fire`: per-instance listeners keyed by event name, kept
//!   in registration order
//! - source event declarations: listeners that call a method of the
//!   declaring (owner) component
//! - `dispatch`: walks parent components outward until one receives

use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::get_component;
use crate::expr::engine;
use crate::types::Value;
use crate::view::types::{EventHandler, Message};

use super::Component;

// =============================================================================
// Listener Registry
// =============================================================================

/// Handle returned by [`Component::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventListenerId(usize);

pub(crate) struct EventRegistry {
    handlers: HashMap<String, Vec<(EventListenerId, EventHandler)>>,
    next_id: usize,
}

impl EventRegistry {
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> EventListenerId {
        let id = EventListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn add(&mut self, name: &str, handler: EventHandler) -> EventListenerId {
        let id = self.next_id();
        self.handlers
            .entry(name.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn remove(&mut self, name: &str, id: Option<EventListenerId>) {
        if let Some(handlers) = self.handlers.get_mut(name) {
            match id {
                Some(id) => handlers.retain(|(handler_id, _)| *handler_id != id),
                None => handlers.clear(),
            }
            if handlers.is_empty() {
                self.handlers.remove(name);
            }
        }
    }

    fn snapshot(&self, name: &str) -> Vec<EventHandler> {
        self.handlers
            .get(name)
            .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }
}

// =============================================================================
// Public API
// =============================================================================

impl Component {
    /// Listen for `name`. Listeners run in registration order.
    pub fn on(&self, name: &str, handler: impl Fn(&Value) + 'static) -> EventListenerId {
        self.0.listeners.borrow_mut().add(name, Rc::new(handler))
    }

    /// Remove one listener of `name`, or all of them when `id` is `None`.
    pub fn un(&self, name: &str, id: Option<EventListenerId>) {
        self.0.listeners.borrow_mut().remove(name, id);
    }

    /// Invoke the listeners of `name` with `event`.
    ///
    /// Listeners added or removed while firing take effect on the next fire.
    pub fn fire(&self, name: &str, event: impl Into<Value>) {
        let event = event.into();
        let handlers = self.0.listeners.borrow().snapshot(name);
        for handler in handlers {
            handler(&event);
        }
    }

    /// Number of listeners for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.0.listeners.borrow().count(name)
    }

    /// Deliver a message to the nearest ancestor that receives `name` (or
    /// `*`). Dropped when none does.
    pub fn dispatch(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut next = self.0.parent_component;

        while let Some(id) = next {
            let Some(ancestor) = get_component(id) else {
                break;
            };
            if let Some(receiver) = ancestor.class().receiver(name) {
                let message = Message {
                    target: self.clone(),
                    name: name.to_string(),
                    value,
                };
                receiver(&ancestor, &message);
                return;
            }
            next = ancestor.0.parent_component;
        }

        tracing::trace!(id = %self.0.id, message = name, "message dropped: no receiver");
    }

    /// Turn the source's event declarations into listeners that call the
    /// owner's methods.
    pub(crate) fn register_source_events(&self) {
        let Some(source) = self.source() else {
            return;
        };
        let Some(owner_id) = self.0.owner else {
            return;
        };

        for decl in source.events() {
            let owner_has_method = get_component(owner_id)
                .is_some_and(|owner| owner.class().method(&decl.method).is_some());
            if !owner_has_method {
                tracing::warn!(
                    event = %decl.name,
                    method = %decl.method,
                    "event listener method is not defined on the owner"
                );
            }

            let name = decl.name.clone();
            let decl = decl.clone();
            let scope = self.0.scope.clone();
            self.on(&name, move |event| {
                let Some(owner) = get_component(owner_id) else {
                    return;
                };
                let Some(method) = owner.class().method(&decl.method) else {
                    return;
                };

                let args: Vec<Value> = if decl.args.is_empty() {
                    vec![event.clone()]
                } else {
                    let mut frame = scope.as_ref().map(|s| s.raw()).unwrap_or_else(Value::object);
                    if let Value::Object(map) = &mut frame {
                        map.insert("$event".to_string(), event.clone());
                    }
                    let engine = engine();
                    decl.args.iter().map(|arg| engine.evaluate(arg, &frame)).collect()
                };
                method(&owner, &args);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::view::{ComponentClass, ComponentOptions};

    fn make() -> Component {
        let class = ComponentClass::builder("x-emitter").build();
        Component::new(&class, ComponentOptions::default()).unwrap()
    }

    #[test]
    fn test_fire_in_registration_order() {
        let c = make();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        c.on("save", move |v| l1.borrow_mut().push(format!("a:{v}")));
        let l2 = log.clone();
        c.on("save", move |v| l2.borrow_mut().push(format!("b:{v}")));

        c.fire("save", 1);
        assert_eq!(*log.borrow(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_un_one_or_all() {
        let c = make();
        let count = Rc::new(RefCell::new(0));

        let c1 = count.clone();
        let first = c.on("ping", move |_| *c1.borrow_mut() += 1);
        let c2 = count.clone();
        c.on("ping", move |_| *c2.borrow_mut() += 10);

        c.un("ping", Some(first));
        c.fire("ping", Value::Null);
        assert_eq!(*count.borrow(), 10);

        c.un("ping", None);
        c.fire("ping", Value::Null);
        assert_eq!(*count.borrow(), 10);
        assert_eq!(c.listener_count("ping"), 0);
    }

    #[test]
    fn test_listener_removed_while_firing_still_runs_once() {
        let c = make();
        let count = Rc::new(RefCell::new(0));

        let me = c.clone();
        let c1 = count.clone();
        c.on("tick", move |_| {
            *c1.borrow_mut() += 1;
            me.un("tick", None);
        });

        c.fire("tick", Value::Null);
        c.fire("tick", Value::Null);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_dispatch_without_parent_is_dropped() {
        let c = make();
        c.dispatch("nobody", 1);
    }
}
