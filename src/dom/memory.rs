//! In-memory document.
//!
//! A flat arena of nodes keyed by [`DomHandle`]. Removed nodes stay in the
//! arena (detached) so stale handles keep answering queries.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::{DomHandle, DomKind, Renderer};
use crate::types::Value;

#[derive(Debug, Clone)]
struct MemNode {
    kind: DomKind,
    tag: String,
    text: String,
    attrs: IndexMap<String, Value>,
    parent: Option<DomHandle>,
    children: Vec<DomHandle>,
}

impl MemNode {
    fn new(kind: DomKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            text: String::new(),
            attrs: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// In-memory [`Renderer`].
#[derive(Debug, Default)]
pub struct MemoryDom {
    nodes: RefCell<HashMap<DomHandle, MemNode>>,
    next_handle: Cell<u64>,
    prop_writes: Cell<usize>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self, node: MemNode) -> DomHandle {
        let handle = DomHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.nodes.borrow_mut().insert(handle, node);
        handle
    }

    /// Detached element to mount into.
    pub fn create_root(&self, tag: &str) -> DomHandle {
        self.create_element(tag)
    }

    /// Current value of an attribute.
    pub fn attr(&self, node: DomHandle, name: &str) -> Option<Value> {
        self.nodes.borrow().get(&node)?.attrs.get(name).cloned()
    }

    /// Set an attribute without counting it as a patch (for building
    /// pre-rendered documents in tests).
    pub fn set_attr(&self, node: DomHandle, name: &str, value: Value) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.attrs.insert(name.to_string(), value);
        }
    }

    /// Number of [`Renderer::handle_prop`] calls so far.
    pub fn prop_writes(&self) -> usize {
        self.prop_writes.get()
    }

    /// Whether `node` is currently attached somewhere below `root`.
    pub fn contains(&self, root: DomHandle, node: DomHandle) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == root {
                return true;
            }
            current = nodes.get(&handle).and_then(|n| n.parent);
        }
        false
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: DomHandle) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: DomHandle, out: &mut String) {
        let (kind, text, children) = match self.nodes.borrow().get(&node) {
            Some(n) => (n.kind, n.text.clone(), n.children.clone()),
            None => return,
        };
        match kind {
            DomKind::Text => out.push_str(&text),
            DomKind::Comment => {}
            DomKind::Element => {
                for child in children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialize a subtree. Attributes appear in insertion order.
    pub fn to_html(&self, node: DomHandle) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: DomHandle, out: &mut String) {
        let Some(n) = self.nodes.borrow().get(&node).cloned() else {
            return;
        };
        match n.kind {
            DomKind::Text => out.push_str(&n.text),
            DomKind::Comment => {
                let _ = write!(out, "<!--{}-->", n.text);
            }
            DomKind::Element => {
                let _ = write!(out, "<{}", n.tag);
                for (name, value) in &n.attrs {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for child in n.children {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{}>", n.tag);
            }
        }
    }

    fn detach(nodes: &mut HashMap<DomHandle, MemNode>, node: DomHandle) {
        let parent = nodes.get_mut(&node).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
    }
}

impl Renderer for MemoryDom {
    fn create_element(&self, tag: &str) -> DomHandle {
        let mut node = MemNode::new(DomKind::Element);
        node.tag = tag.to_string();
        self.alloc(node)
    }

    fn create_text(&self, text: &str) -> DomHandle {
        let mut node = MemNode::new(DomKind::Text);
        node.text = text.to_string();
        self.alloc(node)
    }

    fn create_comment(&self, data: &str) -> DomHandle {
        let mut node = MemNode::new(DomKind::Comment);
        node.text = data.to_string();
        self.alloc(node)
    }

    fn insert_before(&self, node: DomHandle, parent: DomHandle, before: Option<DomHandle>) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes.contains_key(&node) || !nodes.contains_key(&parent) {
            tracing::debug!(?node, ?parent, "insert_before on unknown node");
            return;
        }
        Self::detach(&mut nodes, node);

        if let Some(p) = nodes.get_mut(&parent) {
            let pos = before
                .and_then(|b| p.children.iter().position(|c| *c == b))
                .unwrap_or(p.children.len());
            p.children.insert(pos, node);
        }
        if let Some(n) = nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
    }

    fn remove(&self, node: DomHandle) {
        Self::detach(&mut self.nodes.borrow_mut(), node);
    }

    fn handle_prop(&self, node: DomHandle, name: &str, value: &Value) {
        self.prop_writes.set(self.prop_writes.get() + 1);
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            match value {
                Value::Null | Value::Bool(false) => {
                    n.attrs.shift_remove(name);
                }
                other => {
                    n.attrs.insert(name.to_string(), other.clone());
                }
            }
        }
    }

    fn set_text(&self, node: DomHandle, text: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.text = text.to_string();
        }
    }

    fn kind(&self, node: DomHandle) -> Option<DomKind> {
        self.nodes.borrow().get(&node).map(|n| n.kind)
    }

    fn tag(&self, node: DomHandle) -> Option<String> {
        self.nodes
            .borrow()
            .get(&node)
            .filter(|n| n.kind == DomKind::Element)
            .map(|n| n.tag.clone())
    }

    fn text(&self, node: DomHandle) -> Option<String> {
        self.nodes
            .borrow()
            .get(&node)
            .filter(|n| n.kind != DomKind::Element)
            .map(|n| n.text.clone())
    }

    fn parent(&self, node: DomHandle) -> Option<DomHandle> {
        self.nodes.borrow().get(&node).and_then(|n| n.parent)
    }

    fn children(&self, node: DomHandle) -> Vec<DomHandle> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }
}
