//! Slot outlets.
//!
//! A `<slot>` in a component template renders either the content the
//! caller inserted for its name or its own default content. Inserted
//! content is evaluated in the caller's scope and owned by the caller;
//! default content belongs to the component.
//!
//! Outlets register themselves with the component that owns the template,
//! which keeps inserted outlets current with the caller's changes and
//! repaints when a slot name expression moves.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{renderer, DomHandle, DomKind, ReverseWalker};
use crate::engine::get_component;
use crate::error::Result;
use crate::expr::Expr;
use crate::store::Change;
use crate::types::ComponentId;

use super::node::{create_node, create_reverse_node, dispose_children, Node, NodeContext};
use super::template::TemplateNode;

/// Rendered slot outlet.
pub struct SlotNode {
    ctx: NodeContext,
    name_expr: Option<Expr>,
    name: Option<String>,
    inserted: bool,
    content: Vec<Rc<TemplateNode>>,
    child_ctx: NodeContext,
    children: RefCell<Vec<Node>>,
    sel: Cell<Option<DomHandle>>,
    el: Cell<Option<DomHandle>>,
    disposed: Cell<bool>,
}

impl SlotNode {
    pub(crate) fn new(template: &Rc<TemplateNode>, ctx: &NodeContext) -> Rc<Self> {
        let name_expr = template.get_prop("name").map(|p| p.expr.clone());
        let name = name_expr.as_ref().map(|expr| ctx.scope.get(expr).to_string());

        let owner = get_component(ctx.owner);
        let inserted_content = owner
            .as_ref()
            .and_then(|owner| owner.source_slot(name.as_deref()));

        let (inserted, content, child_ctx) = match (inserted_content, owner.as_ref()) {
            (Some(content), Some(owner)) => {
                let caller_scope = owner.scope().unwrap_or_else(|| ctx.scope.clone());
                let child_ctx = NodeContext {
                    owner: owner.owner_id().unwrap_or(ctx.owner),
                    scope: caller_scope,
                    parent_component: ctx.parent_component,
                };
                (true, content, child_ctx)
            }
            _ => (false, template.child_nodes().to_vec(), ctx.clone()),
        };

        let node = Rc::new(Self {
            ctx: ctx.clone(),
            name_expr,
            name,
            inserted,
            content,
            child_ctx,
            children: RefCell::new(Vec::new()),
            sel: Cell::new(None),
            el: Cell::new(None),
            disposed: Cell::new(false),
        });

        if let Some(owner) = owner {
            owner.register_slot_child(node.clone());
        }
        node
    }

    /// Adopt the content at the cursor. Anchor comments that are not
    /// present are created.
    pub(crate) fn adopt(
        template: &Rc<TemplateNode>,
        ctx: &NodeContext,
        walker: &mut ReverseWalker,
    ) -> Result<Rc<Self>> {
        let node = Self::new(template, ctx);
        let r = renderer();

        let sel = match walker.current().filter(|n| r.kind(*n) == Some(DomKind::Comment)) {
            Some(existing) => {
                walker.go_next();
                existing
            }
            None => {
                let sel = r.create_comment(&node.anchor_text());
                walker.insert(sel);
                sel
            }
        };
        node.sel.set(Some(sel));

        for child in &node.content {
            let child = create_reverse_node(child, &node.child_ctx, walker)?;
            node.children.borrow_mut().push(child);
        }

        let el = match walker.current().filter(|n| r.kind(*n) == Some(DomKind::Comment)) {
            Some(existing) => {
                walker.go_next();
                existing
            }
            None => {
                let el = r.create_comment(&node.anchor_text());
                walker.insert(el);
                el
            }
        };
        node.el.set(Some(el));
        Ok(node)
    }

    fn anchor_text(&self) -> String {
        match &self.name {
            Some(name) => format!("s-slot:{name}"),
            None => "s-slot".to_string(),
        }
    }

    pub(crate) fn attach(&self, parent: DomHandle, before: Option<DomHandle>) -> Result<()> {
        let r = renderer();
        let sel = r.create_comment(&self.anchor_text());
        r.insert_before(sel, parent, before);
        self.sel.set(Some(sel));

        for template in &self.content {
            let child = create_node(template, &self.child_ctx)?;
            self.children.borrow_mut().push(child.clone());
            child.attach(parent, before)?;
        }

        let el = r.create_comment(&self.anchor_text());
        r.insert_before(el, parent, before);
        self.el.set(Some(el));
        Ok(())
    }

    /// Apply a batch. `from_outer` batches come from the caller's data and
    /// only reach inserted content; the component's own batches only reach
    /// default content.
    pub(crate) fn update(&self, changes: &[Change], from_outer: bool) {
        if self.disposed.get() {
            return;
        }

        if let Some(expr) = &self.name_expr {
            let current = self.ctx.scope.get(expr).to_string();
            if self.name.as_deref() != Some(current.as_str()) {
                if let Some(owner) = get_component(self.ctx.owner) {
                    owner.notify_need_reload();
                }
                return;
            }
        }

        if from_outer == self.inserted {
            for child in self.children() {
                child.update(changes);
            }
        }
    }

    pub(crate) fn dispose(&self, no_detach: bool, no_transition: bool) {
        if self.disposed.replace(true) {
            return;
        }
        let children = std::mem::take(&mut *self.children.borrow_mut());
        dispose_children(&children, no_detach, no_transition);
        if !no_detach {
            crate::dom::remove_el(self.sel.get());
            crate::dom::remove_el(self.el.get());
        }
        self.sel.set(None);
        self.el.set(None);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Resolved name; `None` for the anonymous outlet.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.name_expr.is_some()
    }

    /// Whether the caller supplied the rendered content.
    pub fn is_inserted(&self) -> bool {
        self.inserted
    }

    pub fn children(&self) -> Vec<Node> {
        self.children.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Component whose template declares the outlet.
    pub fn owner(&self) -> ComponentId {
        self.ctx.owner
    }
}

impl std::fmt::Debug for SlotNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotNode")
            .field("name", &self.name)
            .field("inserted", &self.inserted)
            .field("children", &self.children.borrow().len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
