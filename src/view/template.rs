//! Template nodes.
//!
//! Templates are built as values, not parsed from markup. A component class
//! holds one root [`TemplateNode`] (its own element); component references
//! inside a template carry the caller-side props, events, directives and
//! slot content.
//!
//! # Example
//!
//! ```ignore
//! use spark_view::view::TemplateNode;
//! use spark_view::expr::parse_expr;
//!
//! let item = TemplateNode::component("todo-item")
//!     .prop("title", parse_expr("todo.title")?)
//!     .bindx("done", parse_expr("todo.done")?)
//!     .on("remove", "removeTodo")
//!     .child(TemplateNode::element("span").prop("slot", parse_expr("'badge'")?));
//! ```

use std::rc::Rc;

use crate::expr::Expr;
use crate::types::Value;

/// What a template node renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Element,
    Text,
    /// Slot outlet (`<slot name=...>`).
    Slot,
    /// Reference to a component registered with the owning class.
    Component,
}

/// Property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropDecl {
    pub name: String,
    pub expr: Expr,
    /// Coarser expression consulted when `expr` itself is not affected.
    pub hint_expr: Option<Expr>,
    /// Declared with the two-way (`bindx`) form.
    pub two_way: bool,
}

impl PropDecl {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
            hint_expr: None,
            two_way: false,
        }
    }

    /// Name as a data key: `kebab-case` becomes `camelCase`.
    pub fn data_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut upper = false;
        for c in self.name.chars() {
            if c == '-' {
                upper = true;
            } else if upper {
                out.extend(c.to_uppercase());
                upper = false;
            } else {
                out.push(c);
            }
        }
        out
    }

    pub(crate) fn is_dynamic(&self) -> bool {
        self.expr.is_accessor()
    }
}

/// Event declaration (`on-<name>="method(args)"`).
#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub name: String,
    /// Method of the declaring component's class.
    pub method: String,
    /// Arguments evaluated in the declaring scope. `$event` refers to the
    /// fired value. Empty means the fired value is the only argument.
    pub args: Vec<Expr>,
}

/// Directives the core understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    /// Component root only: render a placeholder comment while falsy.
    pub if_: Option<Expr>,
    pub ref_: Option<Expr>,
    /// Spread binding: every key of the evaluated object becomes a prop.
    pub bind: Option<Expr>,
}

/// One node of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    kind: TemplateKind,
    tag: String,
    text: Option<Expr>,
    props: Vec<PropDecl>,
    directives: Directives,
    events: Vec<EventDecl>,
    children: Vec<Rc<TemplateNode>>,
}

impl TemplateNode {
    fn with_kind(kind: TemplateKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            text: None,
            props: Vec::new(),
            directives: Directives::default(),
            events: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Plain element.
    pub fn element(tag: &str) -> Self {
        Self::with_kind(TemplateKind::Element, tag)
    }

    /// Component reference, resolved through the owner class.
    pub fn component(tag: &str) -> Self {
        Self::with_kind(TemplateKind::Component, tag)
    }

    /// Slot outlet. Anonymous unless given a `name` prop.
    pub fn slot() -> Self {
        Self::with_kind(TemplateKind::Slot, "slot")
    }

    /// Text node showing the value of `expr`.
    pub fn text(expr: Expr) -> Self {
        let mut node = Self::with_kind(TemplateKind::Text, "");
        node.text = Some(expr);
        node
    }

    /// Text node with fixed content.
    pub fn static_text(text: &str) -> Self {
        Self::text(Expr::Literal(Value::from(text)))
    }

    // =========================================================================
    // Builder
    // =========================================================================

    pub fn prop(mut self, name: &str, expr: Expr) -> Self {
        self.props.push(PropDecl::new(name, expr));
        self
    }

    pub fn prop_hinted(mut self, name: &str, expr: Expr, hint: Expr) -> Self {
        let mut prop = PropDecl::new(name, expr);
        prop.hint_expr = Some(hint);
        self.props.push(prop);
        self
    }

    /// Two-way binding (component references only).
    pub fn bindx(mut self, name: &str, expr: Expr) -> Self {
        let mut prop = PropDecl::new(name, expr);
        prop.two_way = true;
        self.props.push(prop);
        self
    }

    /// Slot outlet name, or the target slot of caller-supplied content.
    pub fn named(self, expr: Expr) -> Self {
        let prop = if self.kind == TemplateKind::Slot { "name" } else { "slot" };
        self.prop(prop, expr)
    }

    pub fn if_(mut self, expr: Expr) -> Self {
        self.directives.if_ = Some(expr);
        self
    }

    pub fn ref_(mut self, expr: Expr) -> Self {
        self.directives.ref_ = Some(expr);
        self
    }

    /// Spread binding.
    pub fn spread(mut self, expr: Expr) -> Self {
        self.directives.bind = Some(expr);
        self
    }

    /// Call `method` of the declaring component when `event` fires.
    pub fn on(self, event: &str, method: &str) -> Self {
        self.on_with(event, method, Vec::new())
    }

    pub fn on_with(mut self, event: &str, method: &str, args: Vec<Expr>) -> Self {
        self.events.push(EventDecl {
            name: event.to_string(),
            method: method.to_string(),
            args,
        });
        self
    }

    pub fn child(mut self, child: TemplateNode) -> Self {
        self.children.push(Rc::new(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = TemplateNode>) -> Self {
        self.children.extend(children.into_iter().map(Rc::new));
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text_expr(&self) -> Option<&Expr> {
        self.text.as_ref()
    }

    pub fn props(&self) -> &[PropDecl] {
        &self.props
    }

    /// Property declared under `name`.
    pub fn get_prop(&self, name: &str) -> Option<&PropDecl> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn events(&self) -> &[EventDecl] {
        &self.events
    }

    pub fn child_nodes(&self) -> &[Rc<TemplateNode>] {
        &self.children
    }

    /// Props whose value depends on data.
    pub(crate) fn dynamic_props(&self) -> impl Iterator<Item = &PropDecl> {
        self.props.iter().filter(|p| p.is_dynamic())
    }

    /// Tags of every component referenced in this subtree.
    pub(crate) fn component_tags(&self, out: &mut Vec<String>) {
        if self.kind == TemplateKind::Component && !out.contains(&self.tag) {
            out.push(self.tag.clone());
        }
        for child in &self.children {
            child.component_tags(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_name_camel_cases() {
        let prop = PropDecl::new("max-item-count", Expr::path(&["n"]));
        assert_eq!(prop.data_name(), "maxItemCount");
        assert_eq!(PropDecl::new("title", Expr::path(&["t"])).data_name(), "title");
    }

    #[test]
    fn test_named_targets_slot_or_content() {
        let outlet = TemplateNode::slot().named(Expr::Literal(Value::from("head")));
        assert!(outlet.get_prop("name").is_some());

        let content = TemplateNode::element("h1").named(Expr::Literal(Value::from("head")));
        assert!(content.get_prop("slot").is_some());
    }

    #[test]
    fn test_component_tags() {
        let tree = TemplateNode::element("div")
            .child(TemplateNode::component("x-a"))
            .child(TemplateNode::element("p").child(TemplateNode::component("x-b")))
            .child(TemplateNode::component("x-a"));

        let mut tags = Vec::new();
        tree.component_tags(&mut tags);
        assert_eq!(tags, vec!["x-a".to_string(), "x-b".to_string()]);
    }

    #[test]
    fn test_dynamic_props() {
        let node = TemplateNode::element("a")
            .prop("href", Expr::path(&["url"]))
            .prop("target", Expr::Literal(Value::from("_blank")));
        let names: Vec<_> = node.dynamic_props().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["href"]);
    }
}
