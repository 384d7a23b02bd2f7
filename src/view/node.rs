//! Rendered nodes.
//!
//! A component's rendered tree is made of four node kinds. Every node keeps
//! the context it was created in: the component that owns it (whose methods
//! and child component registry it uses), the data store its expressions
//! read, and the nearest component in the render tree above it.
//!
//! Parents own their children (`Node` values hold `Rc`s); the owner and
//! parent component are ids resolved through the registry.

use std::rc::Rc;

use crate::dom::{DomHandle, ReverseWalker};
use crate::engine::get_component;
use crate::error::Result;
use crate::expr::{engine, Expr, Relation};
use crate::store::{Change, DataStore};
use crate::types::{ComponentId, Value};

use super::component::{Component, ComponentOptions};
use super::element::ElementNode;
use super::slot::SlotNode;
use super::template::{TemplateKind, TemplateNode};
use super::text::TextNode;

/// Where a node was created.
#[derive(Clone)]
pub(crate) struct NodeContext {
    pub(crate) owner: ComponentId,
    pub(crate) scope: Rc<DataStore>,
    pub(crate) parent_component: ComponentId,
}

/// One rendered node.
#[derive(Clone)]
pub enum Node {
    Element(Rc<ElementNode>),
    Text(Rc<TextNode>),
    Slot(Rc<SlotNode>),
    Component(Component),
}

impl Node {
    pub(crate) fn attach(&self, parent: DomHandle, before: Option<DomHandle>) -> Result<()> {
        match self {
            Node::Element(el) => el.attach(parent, before),
            Node::Text(text) => {
                text.attach(parent, before);
                Ok(())
            }
            Node::Slot(slot) => slot.attach(parent, before),
            Node::Component(c) => c.attach(parent, before),
        }
    }

    pub(crate) fn update(&self, changes: &[Change]) {
        match self {
            Node::Element(el) => el.update(changes),
            Node::Text(text) => text.update(changes),
            Node::Slot(slot) => slot.update(changes, false),
            Node::Component(c) => c.update(Some(changes)),
        }
    }

    pub(crate) fn dispose(&self, no_detach: bool, no_transition: bool) {
        match self {
            Node::Element(el) => el.dispose(no_detach),
            Node::Text(text) => text.dispose(no_detach),
            Node::Slot(slot) => slot.dispose(no_detach, no_transition),
            Node::Component(c) => c.dispose_with(no_detach, no_transition),
        }
    }

    /// Rendered children.
    pub fn children(&self) -> Vec<Node> {
        match self {
            Node::Element(el) => el.children(),
            Node::Text(_) => Vec::new(),
            Node::Slot(slot) => slot.children(),
            Node::Component(c) => c.children(),
        }
    }

    /// Component whose template (or caller-side content) produced the node.
    pub fn owner(&self) -> Option<ComponentId> {
        match self {
            Node::Element(el) => Some(el.owner()),
            Node::Text(text) => Some(text.owner()),
            Node::Slot(slot) => Some(slot.owner()),
            Node::Component(c) => c.owner_id(),
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Node::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_slot(&self) -> Option<&Rc<SlotNode>> {
        match self {
            Node::Slot(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Rc<ElementNode>> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Instantiate `template` without attaching it.
pub(crate) fn create_node(template: &Rc<TemplateNode>, ctx: &NodeContext) -> Result<Node> {
    Ok(match template.kind() {
        TemplateKind::Text => Node::Text(TextNode::new(template, ctx)),
        TemplateKind::Element => Node::Element(ElementNode::new(template, ctx)),
        TemplateKind::Slot => Node::Slot(SlotNode::new(template, ctx)),
        TemplateKind::Component => match create_component(template, ctx, None)? {
            Some(c) => Node::Component(c),
            None => Node::Element(ElementNode::new(template, ctx)),
        },
    })
}

/// Instantiate `template`, adopting the existing node at the walker's
/// cursor where it matches. The result is already attached.
pub(crate) fn create_reverse_node(
    template: &Rc<TemplateNode>,
    ctx: &NodeContext,
    walker: &mut ReverseWalker,
) -> Result<Node> {
    Ok(match template.kind() {
        TemplateKind::Text => Node::Text(TextNode::adopt(template, ctx, walker)),
        TemplateKind::Element => Node::Element(ElementNode::adopt(template, ctx, walker)?),
        TemplateKind::Slot => Node::Slot(SlotNode::adopt(template, ctx, walker)?),
        TemplateKind::Component => match create_component(template, ctx, Some(walker))? {
            Some(c) => Node::Component(c),
            None => Node::Element(ElementNode::adopt(template, ctx, walker)?),
        },
    })
}

fn create_component(
    template: &Rc<TemplateNode>,
    ctx: &NodeContext,
    walker: Option<&mut ReverseWalker>,
) -> Result<Option<Component>> {
    let class = get_component(ctx.owner).and_then(|owner| owner.class().component(template.tag()));
    let Some(class) = class else {
        tracing::warn!(
            tag = template.tag(),
            owner = %ctx.owner,
            "component tag not registered, rendering an element"
        );
        return Ok(None);
    };

    let mut options = ComponentOptions::new();
    options.source = Some(template.clone());
    options.owner = Some(ctx.owner);
    options.scope = Some(ctx.scope.clone());
    options.sub_tag = Some(template.tag().to_string());
    options.parent = Some(ctx.parent_component);

    Component::create(&class, options, walker).map(Some)
}

/// Dispose `children` last to first.
pub(crate) fn dispose_children(children: &[Node], no_detach: bool, no_transition: bool) {
    for child in children.iter().rev() {
        child.dispose(no_detach, no_transition);
    }
}

// =============================================================================
// Expression helpers
// =============================================================================

/// Relation of a change to `target`, with dynamic segments read from `scope`.
pub(crate) fn relation(change: &Change, target: &Expr, scope: &DataStore) -> Relation {
    let engine = engine();
    scope.with_raw(|raw| engine.compare(&change.expr, target, raw))
}

pub(crate) fn affected(changes: &[Change], target: &Expr, scope: &DataStore) -> bool {
    changes.iter().any(|change| relation(change, target, scope).is_related())
}

/// Whether an initial prop value is worth writing.
pub(crate) fn is_renderable(value: &Value) -> bool {
    value.is_truthy() || *value == Value::Number(0.0)
}
