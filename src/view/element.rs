//! Element nodes.
//!
//! An element patches its own dynamic props and forwards the batch to its
//! children. Only props whose expression (or hint expression) relates to a
//! change are re-evaluated and written.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{renderer, DomHandle, DomKind, ReverseWalker};
use crate::error::Result;
use crate::store::Change;
use crate::types::ComponentId;

use super::node::{
    affected, create_node, create_reverse_node, dispose_children, is_renderable, Node, NodeContext,
};
use super::template::TemplateNode;

/// Rendered element.
pub struct ElementNode {
    template: Rc<TemplateNode>,
    ctx: NodeContext,
    el: Cell<Option<DomHandle>>,
    children: RefCell<Vec<Node>>,
    disposed: Cell<bool>,
}

impl ElementNode {
    pub(crate) fn new(template: &Rc<TemplateNode>, ctx: &NodeContext) -> Rc<Self> {
        Rc::new(Self {
            template: template.clone(),
            ctx: ctx.clone(),
            el: Cell::new(None),
            children: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        })
    }

    /// Adopt the element at the cursor when its tag matches.
    pub(crate) fn adopt(
        template: &Rc<TemplateNode>,
        ctx: &NodeContext,
        walker: &mut ReverseWalker,
    ) -> Result<Rc<Self>> {
        let node = Self::new(template, ctx);
        let r = renderer();

        let existing = walker
            .current()
            .filter(|el| {
                r.kind(*el) == Some(DomKind::Element)
                    && r.tag(*el).as_deref() == Some(template.tag())
            });
        let el = match existing {
            Some(el) => {
                walker.go_next();
                el
            }
            None => {
                let el = node.create_el();
                walker.insert(el);
                el
            }
        };
        node.el.set(Some(el));

        let mut child_walker = ReverseWalker::new(el);
        for child in template.child_nodes() {
            let child = create_reverse_node(child, &node.ctx, &mut child_walker)?;
            node.children.borrow_mut().push(child);
        }
        Ok(node)
    }

    fn create_el(&self) -> DomHandle {
        let r = renderer();
        let el = r.create_element(self.template.tag());
        for prop in self.template.props() {
            if prop.name == "slot" {
                continue;
            }
            let value = self.ctx.scope.get(&prop.expr);
            if is_renderable(&value) {
                r.handle_prop(el, &prop.name, &value);
            }
        }
        el
    }

    pub(crate) fn attach(&self, parent: DomHandle, before: Option<DomHandle>) -> Result<()> {
        let el = match self.el.get() {
            Some(el) => el,
            None => {
                let el = self.create_el();
                self.el.set(Some(el));
                el
            }
        };
        renderer().insert_before(el, parent, before);

        if self.children.borrow().is_empty() {
            for child in self.template.child_nodes() {
                let node = create_node(child, &self.ctx)?;
                self.children.borrow_mut().push(node.clone());
                node.attach(el, None)?;
            }
        }
        Ok(())
    }

    pub(crate) fn update(&self, changes: &[Change]) {
        if self.disposed.get() {
            return;
        }
        let Some(el) = self.el.get() else {
            return;
        };

        let scope = &self.ctx.scope;
        for prop in self.template.dynamic_props() {
            if prop.name == "slot" {
                continue;
            }
            let hit = affected(changes, &prop.expr, scope)
                || prop.hint_expr.as_ref().is_some_and(|hint| affected(changes, hint, scope));
            if hit {
                renderer().handle_prop(el, &prop.name, &scope.get(&prop.expr));
            }
        }

        for child in self.children() {
            child.update(changes);
        }
    }

    pub(crate) fn dispose(&self, no_detach: bool) {
        if self.disposed.replace(true) {
            return;
        }
        let children = std::mem::take(&mut *self.children.borrow_mut());
        dispose_children(&children, true, true);
        if !no_detach {
            crate::dom::remove_el(self.el.get());
        }
        self.el.set(None);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn el(&self) -> Option<DomHandle> {
        self.el.get()
    }

    pub fn template(&self) -> &Rc<TemplateNode> {
        &self.template
    }

    pub fn children(&self) -> Vec<Node> {
        self.children.borrow().clone()
    }

    pub fn owner(&self) -> ComponentId {
        self.ctx.owner
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Evaluated `ref` directive.
    pub(crate) fn ref_name(&self) -> Option<String> {
        let expr = self.template.directives().ref_.as_ref()?;
        Some(self.ctx.scope.get(expr).to_string())
    }
}
