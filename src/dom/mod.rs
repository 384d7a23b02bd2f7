//! DOM-facing primitives.
//!
//! The component core never touches a document directly. It creates,
//! inserts, removes and patches nodes through a [`Renderer`], installed per
//! thread. The default is [`MemoryDom`], an in-memory document used by tests
//! and headless hosts.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_view::dom::{set_renderer, MemoryDom};
//!
//! let dom = Rc::new(MemoryDom::new());
//! set_renderer(dom.clone());
//!
//! let root = dom.create_root("body");
//! // ... mount components into `root` ...
//! println!("{}", dom.to_html(root));
//! ```

mod memory;
mod walker;

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::Value;

pub use memory::MemoryDom;
pub use walker::ReverseWalker;

// =============================================================================
// Handles
// =============================================================================

/// Opaque reference to a node owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomHandle(pub(crate) u64);

impl DomHandle {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Kind of a renderer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomKind {
    Element,
    Text,
    Comment,
}

// =============================================================================
// Renderer
// =============================================================================

/// Node creation, insertion, removal and attribute patching.
///
/// All methods take `&self`; implementations use interior mutability so the
/// renderer can be shared by every node of the tree.
pub trait Renderer {
    fn create_element(&self, tag: &str) -> DomHandle;

    fn create_text(&self, text: &str) -> DomHandle;

    fn create_comment(&self, data: &str) -> DomHandle;

    /// Insert `node` into `parent` before `before`, or at the end when
    /// `before` is `None` or not a child of `parent`. A node that already
    /// has a parent is moved.
    fn insert_before(&self, node: DomHandle, parent: DomHandle, before: Option<DomHandle>);

    /// Detach `node` from its parent. Unknown or detached nodes are ignored.
    fn remove(&self, node: DomHandle);

    /// Apply a property value to an element. Null and `false` clear it.
    fn handle_prop(&self, node: DomHandle, name: &str, value: &Value);

    /// Replace the content of a text or comment node.
    fn set_text(&self, node: DomHandle, text: &str);

    fn kind(&self, node: DomHandle) -> Option<DomKind>;

    /// Tag name of an element.
    fn tag(&self, node: DomHandle) -> Option<String>;

    /// Content of a text or comment node.
    fn text(&self, node: DomHandle) -> Option<String>;

    fn parent(&self, node: DomHandle) -> Option<DomHandle>;

    fn children(&self, node: DomHandle) -> Vec<DomHandle>;

    fn first_child(&self, node: DomHandle) -> Option<DomHandle> {
        self.children(node).first().copied()
    }

    fn next_sibling(&self, node: DomHandle) -> Option<DomHandle> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|n| *n == node)?;
        siblings.get(pos + 1).copied()
    }

    fn previous_sibling(&self, node: DomHandle) -> Option<DomHandle> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|n| *n == node)?;
        pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }
}

// =============================================================================
// Thread-local renderer
// =============================================================================

thread_local! {
    static RENDERER: RefCell<Rc<dyn Renderer>> = RefCell::new(Rc::new(MemoryDom::new()));
}

/// Current renderer.
pub fn renderer() -> Rc<dyn Renderer> {
    RENDERER.with(|r| r.borrow().clone())
}

/// Install a renderer for this thread.
///
/// Nodes created by the previous renderer are not migrated.
pub fn set_renderer(renderer: Rc<dyn Renderer>) {
    RENDERER.with(|r| *r.borrow_mut() = renderer);
}

/// Install a fresh [`MemoryDom`] and return it (for testing).
pub fn reset_renderer() -> Rc<MemoryDom> {
    let dom = Rc::new(MemoryDom::new());
    set_renderer(dom.clone());
    dom
}

/// Remove a node through the current renderer, tolerating `None`.
pub(crate) fn remove_el(node: Option<DomHandle>) {
    if let Some(node) = node {
        renderer().remove(node);
    }
}
