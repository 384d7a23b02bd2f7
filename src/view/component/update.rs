//! Update pipeline.
//!
//! Data changes of a component are batched until the next flush. A flush
//! runs depth-first:
//!
//! 1. caller-side changes (`changes`) update spread and declared bindings
//! 2. moved slot names force a slot rebuild and repaint; otherwise inserted
//!    slot content receives the caller-side changes
//! 3. the batched own changes patch the root element's props and update
//!    the rendered children, which update their own bindings in turn
//! 4. implicit children get the same batch
//! 5. `updated`, then two-way bindings are written back to the owner and
//!    the owner flushes whatever that produced
//!
//! # Relation codes
//!
//! Binding synchronization keys off [`Relation::code`]: above 2 the change
//! is nested inside the bound expression and the local target is extended
//! with the trailing segments; from 2 up a splice is passed through as a
//! splice; everything else re-reads the bound value.

use std::rc::Rc;

use crate::dom::{renderer, DomHandle, DomKind};
use crate::engine::next_tick;
use crate::expr::{extend_accessor, Expr, Relation};
use crate::store::{Change, ChangeKind, ChangeOrigin};
use crate::types::Value;
use crate::view::lifecycle::{Lifecycle, Phase};
use crate::view::node::{affected, relation};

use super::Component;

/// Declared prop of a component use site, synchronized into the data key
/// `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Data key (camel-cased prop name).
    pub name: String,
    /// Expression in the caller's scope.
    pub expr: Expr,
    pub two_way: bool,
}

fn name_segment(name: &str) -> Expr {
    Expr::Literal(Value::String(name.to_string()))
}

impl Component {
    // =========================================================================
    // Batching
    // =========================================================================

    /// Data listener of the component's own store.
    pub(crate) fn data_changer(&self, change: &Change) {
        let lifecycle = self.lifecycle();

        if lifecycle.contains(Lifecycle::CREATED) && self.has_after(Phase::Created) {
            let mut pending = self.0.pending.borrow_mut();
            let batch = pending.get_or_insert_with(|| {
                let weak = Rc::downgrade(&self.0);
                next_tick(move || {
                    if let Some(inner) = weak.upgrade() {
                        Component(inner).update(None);
                    }
                });
                Vec::new()
            });
            batch.push(change.clone());
        } else if lifecycle.contains(Lifecycle::INITED) && self.0.owner.is_some() {
            self.update_bindx_owner(std::slice::from_ref(change));
        }
    }

    /// Whether a flush is waiting for this component.
    pub fn has_pending_changes(&self) -> bool {
        self.0.pending.borrow().is_some()
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Apply caller-side `changes` and then the batched own changes.
    pub(crate) fn update(&self, changes: Option<&[Change]>) {
        if self.lifecycle().is_disposed() {
            return;
        }
        let outer_reload = self.0.need_reload.replace(false);

        if let Some(changes) = changes {
            self.apply_spread(changes);
            self.apply_binds(changes);
            if self.slot_names_affected(changes) {
                self.notify_need_reload();
            }

            if self.0.need_reload.get() {
                self.reload_slots();
            } else {
                self.update_slot_children(changes);
            }
        }

        let pending = self.0.pending.borrow_mut().take();
        if let Some(batch) = pending {
            tracing::debug!(
                id = %self.0.id,
                component = self.0.class.name(),
                changes = batch.len(),
                "flush"
            );

            let expect_element = self.if_passes();
            if let Some(el) = self.0.el.get() {
                let is_element = renderer().kind(el) == Some(DomKind::Element);
                if is_element == expect_element {
                    if is_element {
                        self.apply_root_props(el, &batch);
                        for child in self.children() {
                            child.update(&batch);
                        }
                        if self.0.need_reload.get() {
                            self.reload_slots();
                        }
                    }
                } else if let Err(err) = self.repaint() {
                    tracing::warn!(id = %self.0.id, %err, "repaint failed");
                }
            }

            self.update_implicit_children(&batch);
            self.to_phase(Phase::Updated);

            if self.0.owner.is_some() {
                self.update_bindx_owner(&batch);
                if let Some(owner) = self.owner() {
                    owner.update(None);
                }
            }
        }

        self.0.need_reload.set(outer_reload);
    }

    fn reload_slots(&self) {
        self.0.need_reload.set(false);
        self.init_source_slots(false);
        if let Err(err) = self.repaint_children() {
            tracing::warn!(id = %self.0.id, %err, "slot repaint failed");
        }
    }

    fn update_slot_children(&self, changes: &[Change]) {
        self.0.slot_children.borrow_mut().retain(|slot| !slot.is_disposed());
        let slots = self.slot_children();
        for slot in slots.iter().rev() {
            if slot.is_inserted() {
                slot.update(changes, true);
            }
        }
    }

    fn update_implicit_children(&self, batch: &[Change]) {
        self.0
            .implicit_children
            .borrow_mut()
            .retain(|child| !child.lifecycle().is_disposed());
        let implicit = self.0.implicit_children.borrow().clone();
        for child in implicit {
            child.update(Some(batch));
        }
    }

    fn apply_root_props(&self, el: DomHandle, batch: &[Change]) {
        let data = &self.0.data;
        for prop in self.0.template.dynamic_props() {
            if prop.name == "slot" {
                continue;
            }
            let hit = affected(batch, &prop.expr, data)
                || prop.hint_expr.as_ref().is_some_and(|hint| affected(batch, hint, data));
            if hit {
                renderer().handle_prop(el, &prop.name, &data.get(&prop.expr));
            }
        }
    }

    // =========================================================================
    // Binding Synchronization
    // =========================================================================

    /// Inbound: caller-side changes into this component's data.
    fn apply_binds(&self, changes: &[Change]) {
        let (Some(scope), Some(owner_id)) = (self.0.scope.clone(), self.0.owner) else {
            return;
        };

        for change in changes {
            for bind in &self.0.binds {
                if change.is_from(self.0.id, Some(&bind.name)) {
                    continue;
                }
                let rel = relation(change, &bind.expr, &scope);
                if rel == Relation::Unrelated {
                    continue;
                }
                let code = rel.code();

                let (set_expr, update_expr) = if code > 2 {
                    let rest = change.expr.paths().get(bind.expr.paths().len()..).unwrap_or(&[]);
                    (extend_accessor(vec![name_segment(&bind.name)], rest), change.expr.clone())
                } else {
                    (Expr::path(&[bind.name.as_str()]), bind.expr.clone())
                };
                let origin = Some(ChangeOrigin::component(owner_id));

                match &change.kind {
                    ChangeKind::Splice {
                        index,
                        delete_count,
                        insertions,
                        ..
                    } if code >= 2 => {
                        self.0
                            .data
                            .splice(&set_expr, *index, *delete_count, insertions.clone(), origin);
                    }
                    _ => {
                        let value = scope.get(&update_expr);
                        if self.0.data.get(&set_expr) != value {
                            self.0.data.set(&set_expr, value, origin);
                        }
                    }
                }
            }
        }
    }

    /// Outbound: own changes back into the owner's scope, two-way bindings
    /// only.
    pub(crate) fn update_bindx_owner(&self, changes: &[Change]) {
        let (Some(scope), Some(owner_id)) = (self.0.scope.clone(), self.0.owner) else {
            return;
        };

        for change in changes {
            if change.is_from(owner_id, None) {
                continue;
            }
            for bind in self.0.binds.iter().filter(|b| b.two_way) {
                let local = Expr::path(&[bind.name.as_str()]);
                if !relation(change, &local, &self.0.data).is_related() {
                    continue;
                }

                let paths = change.expr.paths();
                let target = if paths.len() > 1 {
                    extend_accessor(bind.expr.paths().to_vec(), &paths[1..])
                } else {
                    bind.expr.clone()
                };
                let value = self.0.data.get(&change.expr);
                if scope.get(&target) == value {
                    continue;
                }
                scope.set(&target, value, Some(ChangeOrigin::prop(self.0.id, bind.name.clone())));
            }
        }
    }

    /// Spread binding: write the keys of the evaluated object that changed,
    /// except keys bound explicitly.
    fn apply_spread(&self, changes: &[Change]) {
        let Some(expr) = self.source().and_then(|s| s.directives().bind.clone()) else {
            return;
        };
        let (Some(scope), Some(owner_id)) = (self.0.scope.clone(), self.0.owner) else {
            return;
        };
        if !affected(changes, &expr, &scope) {
            return;
        }

        let next = scope.get(&expr);
        let previous = self.0.sbind_data.replace(Some(next.clone()));

        let next = next.as_object().cloned().unwrap_or_default();
        let previous = previous
            .and_then(|p| p.as_object().cloned())
            .unwrap_or_default();

        let mut writes: Vec<(String, Value)> = next
            .iter()
            .filter(|(key, value)| previous.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        writes.extend(
            previous
                .keys()
                .filter(|key| !next.contains_key(*key))
                .map(|key| (key.clone(), Value::Null)),
        );

        for (key, value) in writes {
            if self.0.binds.iter().any(|b| b.name == key) {
                continue;
            }
            self.0.data.set(
                &Expr::path(&[key.as_str()]),
                value,
                Some(ChangeOrigin::component(owner_id)),
            );
        }
    }
}
