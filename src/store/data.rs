//! Data Store - Path-addressed mutable value tree with change listeners.
//!
//! Every mutating call builds exactly one [`ChangeRecord`] and hands it to
//! all listeners synchronously, in registration order, before returning.
//!
//! # Re-entrancy
//!
//! No borrow is held while listeners run, so a listener may read the store,
//! mutate it again, or register and unregister listeners. A listener removed
//! during notification is skipped for the rest of that notification; one
//! added during notification first hears the next record.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::change::{Change, ChangeKind, ChangeOrigin, ChangeRecord};
use super::data_types::DataTypes;
use crate::config::config;
use crate::diagnostics::{self, Diagnostic};
use crate::expr::{accessor_from_keys, engine, Expr};
use crate::types::{Key, Value};

/// Handle returned by [`DataStore::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Rc<dyn Fn(&Change)>;

/// How far past the end of an array a write may reach. Farther indexes are
/// treated as unresolvable instead of padding the array with nulls.
const MAX_INDEX_GAP: usize = 1024;

/// Mutable data tree owned by one component.
pub struct DataStore {
    raw: RefCell<Value>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<usize>,
    type_checker: RefCell<Option<DataTypes>>,
}

impl DataStore {
    pub fn new(initial: Value) -> Self {
        let raw = if initial.is_null() { Value::object() } else { initial };
        Self {
            raw: RefCell::new(raw),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            type_checker: RefCell::new(None),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Evaluate `expr` against the current data.
    pub fn get(&self, expr: &Expr) -> Value {
        let engine = engine();
        engine.evaluate(expr, &self.raw.borrow())
    }

    /// Snapshot of the whole tree.
    pub fn raw(&self) -> Value {
        self.raw.borrow().clone()
    }

    /// Borrow the whole tree for the duration of `f`.
    ///
    /// `f` must not mutate this store.
    pub fn with_raw<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.raw.borrow())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `value` at `expr`, creating missing containers on the way.
    ///
    /// Targets that cannot be resolved (a literal, or a dynamic segment that
    /// evaluates to null) are ignored.
    pub fn set(&self, expr: &Expr, value: Value, origin: Option<ChangeOrigin>) {
        let Some(keys) = self.resolve_for_write(expr) else {
            tracing::debug!(expr = %expr, "set ignored: unresolvable target");
            return;
        };

        {
            let mut raw = self.raw.borrow_mut();
            let slot = keys.iter().fold(&mut *raw, |node, key| node.child_mut_or_insert(key));
            *slot = value.clone();
        }

        self.fire(ChangeRecord {
            kind: ChangeKind::Set { value },
            expr: accessor_from_keys(&keys),
            origin,
        });
    }

    /// Remove `delete_count` items at `index` from the array at `expr` and
    /// insert `insertions` in their place. Returns the removed items.
    ///
    /// `index` and `delete_count` are clamped to the array. A missing target
    /// becomes an empty array first; any other non-array is left alone.
    pub fn splice(
        &self,
        expr: &Expr,
        index: usize,
        delete_count: usize,
        insertions: Vec<Value>,
        origin: Option<ChangeOrigin>,
    ) -> Vec<Value> {
        let Some(keys) = self.resolve_for_write(expr) else {
            tracing::debug!(expr = %expr, "splice ignored: unresolvable target");
            return Vec::new();
        };

        let (index, removed) = {
            let mut raw = self.raw.borrow_mut();
            let slot = keys.iter().fold(&mut *raw, |node, key| node.child_mut_or_insert(key));
            if slot.is_null() {
                *slot = Value::array();
            }
            match slot {
                Value::Array(items) => {
                    let index = index.min(items.len());
                    let end = index + delete_count.min(items.len() - index);
                    let removed: Vec<Value> = items
                        .splice(index..end, insertions.iter().cloned())
                        .collect();
                    (index, removed)
                }
                _ => (index, Vec::new()),
            }
        };

        self.fire(ChangeRecord {
            kind: ChangeKind::Splice {
                index,
                delete_count: removed.len(),
                insertions,
                removed: removed.clone(),
            },
            expr: accessor_from_keys(&keys),
            origin,
        });
        removed
    }

    /// Append to the array at `expr`.
    pub fn push(&self, expr: &Expr, value: Value, origin: Option<ChangeOrigin>) {
        let len = self.array_len(expr);
        self.splice(expr, len, 0, vec![value], origin);
    }

    /// Remove and return the last item of the array at `expr`.
    pub fn pop(&self, expr: &Expr, origin: Option<ChangeOrigin>) -> Option<Value> {
        let len = self.array_len(expr);
        if len == 0 {
            return None;
        }
        self.splice(expr, len - 1, 1, Vec::new(), origin).pop()
    }

    /// Remove the item at `index` of the array at `expr`.
    pub fn remove_at(
        &self,
        expr: &Expr,
        index: usize,
        origin: Option<ChangeOrigin>,
    ) -> Option<Value> {
        self.splice(expr, index, 1, Vec::new(), origin).pop()
    }

    fn array_len(&self, expr: &Expr) -> usize {
        self.get(expr).as_array().map_or(0, Vec::len)
    }

    fn resolve(&self, expr: &Expr) -> Option<Vec<Key>> {
        let engine = engine();
        engine.resolve(expr, &self.raw.borrow())
    }

    /// Resolve a write target, rejecting indexes more than
    /// [`MAX_INDEX_GAP`] past the end of the array they address.
    fn resolve_for_write(&self, expr: &Expr) -> Option<Vec<Key>> {
        let keys = self.resolve(expr)?;
        let raw = self.raw.borrow();
        let mut node = Some(&*raw);
        for key in &keys {
            if let Key::Index(index) = key {
                if !matches!(node, Some(Value::Object(_))) {
                    let len = node.and_then(Value::as_array).map_or(0, Vec::len);
                    if *index > len.saturating_add(MAX_INDEX_GAP) {
                        return None;
                    }
                }
            }
            node = node.and_then(|n| n.child(key));
        }
        Some(keys)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a change listener.
    pub fn listen(&self, listener: impl Fn(&Change) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove one listener, or all of them when `id` is `None`.
    pub fn unlisten(&self, id: Option<ListenerId>) {
        let mut listeners = self.listeners.borrow_mut();
        match id {
            Some(id) => listeners.retain(|(l, _)| *l != id),
            None => listeners.clear(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn fire(&self, record: ChangeRecord) {
        let change: Change = Rc::new(record);
        tracing::trace!(
            expr = %change.expr,
            splice = change.is_splice(),
            origin = ?change.origin.as_ref().map(|o| o.id),
            "data change"
        );

        let snapshot: Vec<(ListenerId, Listener)> = self.listeners.borrow().clone();
        for (id, listener) in snapshot {
            let live = self.listeners.borrow().iter().any(|(l, _)| *l == id);
            if live {
                listener(&change);
            }
        }

        if config().type_checking {
            if let Err(diagnostic) = self.check_data_types() {
                diagnostics::report(diagnostic);
            }
        }
    }

    // =========================================================================
    // Type Checking
    // =========================================================================

    /// Install a development-time schema.
    pub fn set_type_checker(&self, checker: DataTypes) {
        *self.type_checker.borrow_mut() = Some(checker);
    }

    /// Validate against the installed schema, if any.
    pub fn check_data_types(&self) -> Result<(), Diagnostic> {
        match &*self.type_checker.borrow() {
            Some(checker) => checker.check(&self.raw.borrow()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("raw", &self.raw.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
