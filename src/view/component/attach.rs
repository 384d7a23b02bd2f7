//! Attachment, repaint and disposal.
//!
//! Disposal goes through the same path as a leave: `dispose` marks the
//! leave as disposing and calls `detach`; the leave transition (if any)
//! decides when `done_leave` runs.

use std::rc::Rc;

use crate::dom::{remove_el, renderer, DomHandle, DomKind, ReverseWalker};
use crate::engine::release_component;
use crate::error::Result;
use crate::view::lifecycle::{Lifecycle, Phase};
use crate::view::node::{create_node, create_reverse_node, dispose_children, is_renderable, Node};

use super::{Component, LeaveMode};

impl Component {
    // =========================================================================
    // Attach
    // =========================================================================

    /// Insert the component into `parent`, before `before` when given.
    ///
    /// A component with an owner that is not part of the owner's rendered
    /// tree becomes one of the owner's implicit children and receives the
    /// owner's changes from then on.
    pub fn attach(&self, parent: DomHandle, before: Option<DomHandle>) -> Result<()> {
        if self.lifecycle().is_attached() || self.lifecycle().is_disposed() {
            return Ok(());
        }
        self.attach_inner(parent, before)?;

        if !self.0.in_tree {
            if let Some(owner) = self.owner() {
                let mut implicit = owner.0.implicit_children.borrow_mut();
                if !implicit.iter().any(|c| c.ptr_eq(self)) {
                    implicit.push(self.clone());
                }
            }
        }
        Ok(())
    }

    fn attach_inner(&self, parent: DomHandle, before: Option<DomHandle>) -> Result<()> {
        let r = renderer();

        if self.if_passes() {
            let el = match self.0.el.get() {
                Some(el) if r.kind(el) == Some(DomKind::Element) => el,
                _ => {
                    let el = self.create_el();
                    self.0.el.set(Some(el));
                    el
                }
            };
            r.insert_before(el, parent, before);

            if !self.0.content_ready.get() {
                let ctx = self.child_ctx();
                for template in self.0.template.child_nodes() {
                    let child = create_node(template, &ctx)?;
                    self.0.children.borrow_mut().push(child.clone());
                    child.attach(el, None)?;
                }
                self.0.content_ready.set(true);
            }
        } else {
            let placeholder = r.create_comment(&self.0.id.to_string());
            self.0.el.set(Some(placeholder));
            r.insert_before(placeholder, parent, before);
        }

        self.attached();
        Ok(())
    }

    /// Root element with the template's root props applied.
    pub(crate) fn create_el(&self) -> DomHandle {
        let r = renderer();
        let el = r.create_element(&self.0.tag);
        for prop in self.0.template.props() {
            if prop.name == "slot" {
                continue;
            }
            let value = self.0.data.get(&prop.expr);
            if is_renderable(&value) {
                r.handle_prop(el, &prop.name, &value);
            }
        }
        el
    }

    /// Adopt existing children of `el` for the template's children.
    pub(crate) fn adopt_children(&self, el: DomHandle) -> Result<()> {
        let ctx = self.child_ctx();
        let mut walker = ReverseWalker::new(el);
        for template in self.0.template.child_nodes() {
            let child = create_reverse_node(template, &ctx, &mut walker)?;
            self.0.children.borrow_mut().push(child);
        }
        self.0.content_ready.set(true);
        Ok(())
    }

    pub(crate) fn attached(&self) {
        self.to_phase(Phase::Created);
        self.to_phase(Phase::Attached);

        let enter = self.0.transition.as_ref().and_then(|t| t.enter.clone());
        if let (Some(enter), Some(el)) = (enter, self.0.el.get()) {
            if renderer().kind(el) == Some(DomKind::Element) {
                enter(el);
            }
        }
    }

    // =========================================================================
    // Repaint
    // =========================================================================

    /// Dispose every rendered child and render the template's children
    /// again. Slot outlets register themselves anew.
    pub(crate) fn repaint_children(&self) -> Result<()> {
        let Some(el) = self.0.el.get() else {
            return Ok(());
        };
        if renderer().kind(el) != Some(DomKind::Element) {
            return Ok(());
        }
        tracing::debug!(id = %self.0.id, component = self.0.class.name(), "repaint children");

        let old = std::mem::take(&mut *self.0.children.borrow_mut());
        dispose_children(&old, false, true);
        self.0.slot_children.borrow_mut().clear();

        let ctx = self.child_ctx();
        for template in self.0.template.child_nodes() {
            let child = create_node(template, &ctx)?;
            self.0.children.borrow_mut().push(child.clone());
            child.attach(el, None)?;
        }
        Ok(())
    }

    /// Rebuild the whole component in place of its current root node.
    pub(crate) fn repaint(&self) -> Result<()> {
        tracing::debug!(id = %self.0.id, component = self.0.class.name(), "repaint");

        let old = std::mem::take(&mut *self.0.children.borrow_mut());
        dispose_children(&old, true, true);
        self.0.slot_children.borrow_mut().clear();
        self.0.content_ready.set(false);

        let Some(before) = self.0.el.take() else {
            return Ok(());
        };
        let Some(parent) = renderer().parent(before) else {
            return Ok(());
        };
        self.attach_inner(parent, Some(before))?;
        remove_el(Some(before));
        Ok(())
    }

    // =========================================================================
    // Leave
    // =========================================================================

    /// Remove from the DOM, running the leave transition first.
    pub fn detach(&self) {
        if self.lifecycle().is_disposed() {
            return;
        }
        self.leave();
    }

    /// Dispose the component, its rendered children and its implicit
    /// children.
    pub fn dispose(&self) {
        self.dispose_with(false, false);
    }

    pub(crate) fn dispose_with(&self, no_detach: bool, no_transition: bool) {
        if self.lifecycle().is_disposed() {
            return;
        }
        self.0.leave_mode.set(LeaveMode {
            dispose: true,
            no_detach,
            no_transition,
        });
        self.leave();
    }

    fn leave(&self) {
        let lifecycle = self.lifecycle();
        if lifecycle.contains(Lifecycle::LEAVING) {
            return;
        }

        if !self.0.leave_mode.get().no_transition {
            let leave = self.0.transition.as_ref().and_then(|t| t.leave.clone());
            if let (Some(leave), Some(el), true) =
                (leave, self.0.el.get(), lifecycle.is_attached())
            {
                self.to_phase(Phase::Leaving);
                let weak = Rc::downgrade(&self.0);
                leave(
                    el,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            Component(inner).done_leave();
                        }
                    }),
                );
                return;
            }
        }
        self.done_leave();
    }

    pub(crate) fn done_leave(&self) {
        let mode = self.0.leave_mode.get();

        if mode.dispose {
            if self.lifecycle().is_disposed() {
                return;
            }
            self.0.slot_children.borrow_mut().clear();
            self.0.data.unlisten(None);
            self.0.pending.borrow_mut().take();

            let implicit = std::mem::take(&mut *self.0.implicit_children.borrow_mut());
            for child in implicit.iter().rev() {
                child.dispose_with(false, true);
            }

            let children = std::mem::take(&mut *self.0.children.borrow_mut());
            dispose_children(&children, true, true);
            if !mode.no_detach {
                remove_el(self.0.el.get());
            }
            self.0.el.set(None);

            self.to_phase(Phase::Detached);
            self.to_phase(Phase::Disposed);
            release_component(self.0.id);

            self.0.listeners.borrow_mut().clear();
            self.0.source.borrow_mut().take();
            *self.0.source_slots.borrow_mut() = Default::default();
        } else if self.lifecycle().is_attached() {
            remove_el(self.0.el.get());
            self.to_phase(Phase::Detached);
        }
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Rendered children of the root element.
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    /// Components attached by hand under this owner.
    pub fn implicit_children(&self) -> Vec<Component> {
        self.0.implicit_children.borrow().clone()
    }
}
