//! Text nodes.

use std::cell::Cell;
use std::rc::Rc;

use crate::dom::{renderer, DomHandle, DomKind, ReverseWalker};
use crate::expr::Expr;
use crate::store::Change;
use crate::types::{ComponentId, Value};

use super::node::{affected, NodeContext};
use super::template::TemplateNode;

/// Rendered text.
pub struct TextNode {
    expr: Expr,
    ctx: NodeContext,
    el: Cell<Option<DomHandle>>,
    disposed: Cell<bool>,
}

impl TextNode {
    pub(crate) fn new(template: &Rc<TemplateNode>, ctx: &NodeContext) -> Rc<Self> {
        Rc::new(Self {
            expr: template
                .text_expr()
                .cloned()
                .unwrap_or(Expr::Literal(Value::Null)),
            ctx: ctx.clone(),
            el: Cell::new(None),
            disposed: Cell::new(false),
        })
    }

    /// Adopt the text node at the cursor, correcting its content.
    pub(crate) fn adopt(
        template: &Rc<TemplateNode>,
        ctx: &NodeContext,
        walker: &mut ReverseWalker,
    ) -> Rc<Self> {
        let node = Self::new(template, ctx);
        let r = renderer();
        let content = node.content();

        match walker.current().filter(|n| r.kind(*n) == Some(DomKind::Text)) {
            Some(existing) => {
                if r.text(existing).as_deref() != Some(content.as_str()) {
                    r.set_text(existing, &content);
                }
                node.el.set(Some(existing));
                walker.go_next();
            }
            None => {
                let el = r.create_text(&content);
                walker.insert(el);
                node.el.set(Some(el));
            }
        }
        node
    }

    fn content(&self) -> String {
        self.ctx.scope.get(&self.expr).to_string()
    }

    pub(crate) fn attach(&self, parent: DomHandle, before: Option<DomHandle>) {
        let r = renderer();
        let el = match self.el.get() {
            Some(el) => el,
            None => {
                let el = r.create_text(&self.content());
                self.el.set(Some(el));
                el
            }
        };
        r.insert_before(el, parent, before);
    }

    pub(crate) fn update(&self, changes: &[Change]) {
        if self.disposed.get() {
            return;
        }
        if let Some(el) = self.el.get() {
            if affected(changes, &self.expr, &self.ctx.scope) {
                renderer().set_text(el, &self.content());
            }
        }
    }

    pub(crate) fn dispose(&self, no_detach: bool) {
        if self.disposed.replace(true) {
            return;
        }
        if !no_detach {
            crate::dom::remove_el(self.el.get());
        }
        self.el.set(None);
    }

    pub fn el(&self) -> Option<DomHandle> {
        self.el.get()
    }

    pub fn owner(&self) -> ComponentId {
        self.ctx.owner
    }
}
