//! Slot distribution, slot lookup and refs.
//!
//! Caller-supplied content is sorted once per rebuild: children with a
//! `slot` prop go to the named list for the evaluated name, the rest go to
//! the anonymous list (built on the first pass only). Outlets read their
//! content from here when they are created, so changing an assignment means
//! rebuilding the lists and recreating the outlets.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::store::Change;
use crate::view::node::{affected, Node};
use crate::view::slot::SlotNode;
use crate::view::template::{PropDecl, TemplateKind, TemplateNode};
use crate::view::types::RefTarget;

use super::Component;

/// Caller-supplied content by slot name.
#[derive(Debug, Default)]
pub(crate) struct SourceSlots {
    pub(crate) named: IndexMap<String, Vec<Rc<TemplateNode>>>,
    pub(crate) noname: Option<Vec<Rc<TemplateNode>>>,
    /// `slot` props seen on the first pass; their expressions decide when
    /// the lists need a rebuild.
    pub(crate) name_props: Vec<PropDecl>,
}

impl Component {
    /// Sort the source children into slot lists.
    pub(crate) fn init_source_slots(&self, first_time: bool) {
        let mut slots = self.0.source_slots.borrow_mut();
        slots.named.clear();

        let (Some(source), Some(scope)) = (self.source(), self.0.scope.clone()) else {
            return;
        };

        for child in source.child_nodes() {
            let slot_prop = match child.kind() {
                TemplateKind::Text => None,
                _ => child.get_prop("slot"),
            };

            match slot_prop {
                Some(prop) => {
                    if first_time {
                        slots.name_props.push(prop.clone());
                    }
                    let name = scope.get(&prop.expr).to_string();
                    slots.named.entry(name).or_default().push(child.clone());
                }
                None if first_time => {
                    slots.noname.get_or_insert_with(Vec::new).push(child.clone());
                }
                None => {}
            }
        }

        tracing::debug!(
            id = %self.0.id,
            named = slots.named.len(),
            anonymous = slots.noname.as_ref().map_or(0, Vec::len),
            "slot registry built"
        );
    }

    /// Content inserted for `name` (anonymous when `None`).
    pub(crate) fn source_slot(&self, name: Option<&str>) -> Option<Vec<Rc<TemplateNode>>> {
        let slots = self.0.source_slots.borrow();
        match name {
            Some(name) => slots.named.get(name).cloned(),
            None => slots.noname.clone(),
        }
    }

    pub(crate) fn slot_names_affected(&self, changes: &[Change]) -> bool {
        let Some(scope) = self.0.scope.as_ref() else {
            return false;
        };
        self.0
            .source_slots
            .borrow()
            .name_props
            .iter()
            .any(|prop| affected(changes, &prop.expr, scope))
    }

    pub(crate) fn register_slot_child(&self, slot: Rc<SlotNode>) {
        self.0.slot_children.borrow_mut().push(slot);
    }

    /// Ask the running update to rebuild slots and repaint.
    pub(crate) fn notify_need_reload(&self) {
        self.0.need_reload.set(true);
    }

    /// Outlets of this component whose content the caller supplied and whose
    /// name matches (`None` for the anonymous outlet).
    pub fn slot(&self, name: Option<&str>) -> Vec<Rc<SlotNode>> {
        let mut result = Vec::new();
        self.collect_slots(&self.children(), name, &mut result);
        result
    }

    fn collect_slots(&self, children: &[Node], name: Option<&str>, out: &mut Vec<Rc<SlotNode>>) {
        for child in children {
            match child {
                Node::Slot(slot) if slot.owner() == self.0.id => {
                    let matches = match name {
                        Some(name) => slot.is_named() && slot.name() == Some(name),
                        None => !slot.is_named(),
                    };
                    if matches && slot.is_inserted() {
                        out.push(slot.clone());
                    }
                }
                other => self.collect_slots(&other.children(), name, out),
            }
        }
    }

    /// Element or component carrying `ref` = `name` among the nodes this
    /// component owns.
    pub fn ref_(&self, name: &str) -> Option<RefTarget> {
        self.find_ref(&self.children(), name)
    }

    fn find_ref(&self, children: &[Node], name: &str) -> Option<RefTarget> {
        children.iter().find_map(|child| self.ref_in(child, name))
    }

    fn ref_in(&self, node: &Node, name: &str) -> Option<RefTarget> {
        let owned = node.owner() == Some(self.0.id);

        if owned {
            match node {
                Node::Element(el) => {
                    if el.ref_name().as_deref() == Some(name) {
                        return el.el().map(RefTarget::Element);
                    }
                }
                Node::Component(c) => {
                    if c.ref_name().as_deref() == Some(name) {
                        return Some(RefTarget::Component(c.clone()));
                    }
                    let slots: Vec<Node> = c.slot_children().into_iter().map(Node::Slot).collect();
                    if let Some(found) = self.find_ref(&slots, name) {
                        return Some(found);
                    }
                }
                Node::Text(_) | Node::Slot(_) => {}
            }
        }

        match node {
            Node::Text(_) => None,
            _ => self.find_ref(&node.children(), name),
        }
    }
}
