//! Reverse walker for adopting pre-rendered children.
//!
//! Snapshots the children of a target element (dropping whitespace-only
//! text nodes) and hands them out one at a time, so node constructors can
//! adopt the existing node at the cursor instead of creating a new one.

use super::{renderer, DomHandle, DomKind};

/// Cursor over the existing children of `target`.
#[derive(Debug, Clone)]
pub struct ReverseWalker {
    target: DomHandle,
    raw: Vec<DomHandle>,
    index: usize,
}

impl ReverseWalker {
    pub fn new(target: DomHandle) -> Self {
        let r = renderer();
        let mut raw = Vec::new();
        for child in r.children(target) {
            let blank = r.kind(child) == Some(DomKind::Text)
                && r.text(child).is_some_and(|t| t.trim().is_empty());
            if blank {
                r.remove(child);
            } else {
                raw.push(child);
            }
        }
        Self { target, raw, index: 0 }
    }

    /// Element whose children are walked.
    pub fn target(&self) -> DomHandle {
        self.target
    }

    /// Node at the cursor.
    pub fn current(&self) -> Option<DomHandle> {
        self.raw.get(self.index).copied()
    }

    /// Kind of the node at the cursor.
    pub fn current_kind(&self) -> Option<DomKind> {
        self.current().and_then(|node| renderer().kind(node))
    }

    /// Advance past the node at the cursor.
    pub fn go_next(&mut self) {
        if self.index < self.raw.len() {
            self.index += 1;
        }
    }

    /// Insert a freshly created node before the cursor.
    pub fn insert(&self, node: DomHandle) {
        renderer().insert_before(node, self.target, self.current());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{reset_renderer, Renderer};

    #[test]
    fn test_walks_and_skips_blank_text() {
        let dom = reset_renderer();
        let root = dom.create_root("div");
        let blank = dom.create_text("  \n ");
        let p = dom.create_element("p");
        let text = dom.create_text("x");
        for node in [blank, p, text] {
            dom.insert_before(node, root, None);
        }

        let mut walker = ReverseWalker::new(root);
        assert_eq!(walker.current(), Some(p));
        assert_eq!(walker.current_kind(), Some(DomKind::Element));
        walker.go_next();
        assert_eq!(walker.current(), Some(text));
        walker.go_next();
        assert_eq!(walker.current(), None);
        walker.go_next();
        assert_eq!(walker.current(), None);

        // Blank text was dropped from the document.
        assert_eq!(dom.children(root), vec![p, text]);
    }

    #[test]
    fn test_insert_before_cursor() {
        let dom = reset_renderer();
        let root = dom.create_root("div");
        let existing = dom.create_element("p");
        dom.insert_before(existing, root, None);

        let walker = ReverseWalker::new(root);
        let created = dom.create_comment("anchor");
        walker.insert(created);
        assert_eq!(dom.children(root), vec![created, existing]);
    }
}
