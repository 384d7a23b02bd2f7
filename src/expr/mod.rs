//! Expression collaborator.
//!
//! The component core never interprets paths on its own: it asks an
//! [`ExprEngine`] to parse, evaluate and compare [`Expr`]s, and to build new
//! accessors from path segments. The engine is installed per thread; the
//! default is [`PathEngine`], which understands property-access paths and
//! literals.
//!
//! # Relations
//!
//! [`ExprEngine::compare`] classifies how a mutation relates to a target
//! expression. The numeric [`Relation::code`] is significant: binding
//! synchronization extends paths for codes above 2 and passes splices
//! through for codes of 2 and above.

mod path;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::types::{Key, Value};

pub use path::PathEngine;
pub(crate) use path::accessor_from_keys;

// =============================================================================
// Expr
// =============================================================================

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Property access. Every segment is a string/number literal or a
    /// nested accessor evaluated at use (`list[index]`).
    Accessor(Vec<Expr>),
    /// Constant value.
    Literal(Value),
}

impl Expr {
    /// Accessor over static names.
    pub fn path<S: AsRef<str>>(names: &[S]) -> Self {
        Expr::Accessor(
            names
                .iter()
                .map(|n| Expr::Literal(Value::String(n.as_ref().to_string())))
                .collect(),
        )
    }

    /// Accessor segments; empty for literals.
    pub fn paths(&self) -> &[Expr] {
        match self {
            Expr::Accessor(paths) => paths,
            Expr::Literal(_) => &[],
        }
    }

    /// Static key of a literal segment.
    pub fn static_key(&self) -> Option<Key> {
        match self {
            Expr::Literal(Value::String(s)) => Some(Key::Name(s.clone())),
            Expr::Literal(Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                Some(Key::Index(*n as usize))
            }
            Expr::Literal(other) => Some(Key::Name(other.to_string())),
            Expr::Accessor(_) => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Expr::Accessor(_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::String(s)) => write!(f, "'{s}'"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Accessor(paths) => {
                for (i, seg) in paths.iter().enumerate() {
                    match seg {
                        Expr::Literal(Value::String(name)) if i == 0 => f.write_str(name)?,
                        Expr::Literal(Value::String(name))
                            if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                                && !name.starts_with(|c: char| c.is_ascii_digit()) =>
                        {
                            write!(f, ".{name}")?
                        }
                        other => write!(f, "[{other}]")?,
                    }
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Relation
// =============================================================================

/// How a mutation path relates to a target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No update needed.
    Unrelated,
    /// The mutation is at or above a strict ancestor of the target, or a
    /// dynamic segment of the target changed; recompute the target.
    MutationIsAncestor,
    /// Same path.
    Exact,
    /// The mutation is nested inside the target by `depth` segments.
    MutationIsDescendant(usize),
}

impl Relation {
    /// Numeric classification: 0, 1, 2, or `depth + 2`.
    pub fn code(self) -> usize {
        match self {
            Relation::Unrelated => 0,
            Relation::MutationIsAncestor => 1,
            Relation::Exact => 2,
            Relation::MutationIsDescendant(depth) => depth + 2,
        }
    }

    pub fn from_code(code: usize) -> Self {
        match code {
            0 => Relation::Unrelated,
            1 => Relation::MutationIsAncestor,
            2 => Relation::Exact,
            n => Relation::MutationIsDescendant(n - 2),
        }
    }

    pub fn is_related(self) -> bool {
        self != Relation::Unrelated
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Parsing, evaluation and comparison of expressions.
pub trait ExprEngine {
    /// Parse source text.
    fn parse(&self, text: &str) -> Result<Expr>;

    /// Evaluate against a scope value. Missing paths evaluate to `Null`.
    fn evaluate(&self, expr: &Expr, scope: &Value) -> Value;

    /// Classify `change` against `target`, evaluating dynamic target
    /// segments in `scope`.
    fn compare(&self, change: &Expr, target: &Expr, scope: &Value) -> Relation;

    /// Build an accessor from segments.
    fn build_accessor(&self, segments: Vec<Expr>) -> Expr {
        Expr::Accessor(segments)
    }

    /// Resolve every segment of an accessor to a concrete key.
    fn resolve(&self, expr: &Expr, scope: &Value) -> Option<Vec<Key>> {
        let Expr::Accessor(paths) = expr else {
            return None;
        };
        paths
            .iter()
            .map(|seg| match seg.static_key() {
                Some(key) => Some(key),
                None => match self.evaluate(seg, scope) {
                    Value::Null => None,
                    dynamic => Expr::Literal(dynamic).static_key(),
                },
            })
            .collect()
    }
}

thread_local! {
    static ENGINE: RefCell<Rc<dyn ExprEngine>> = RefCell::new(Rc::new(PathEngine));
}

/// Current expression engine.
pub fn engine() -> Rc<dyn ExprEngine> {
    ENGINE.with(|e| e.borrow().clone())
}

/// Install a different expression engine for this thread.
pub fn set_engine(engine: Rc<dyn ExprEngine>) {
    ENGINE.with(|e| *e.borrow_mut() = engine);
}

/// Parse with the current engine.
pub fn parse_expr(text: &str) -> Result<Expr> {
    engine().parse(text)
}

/// Accessor made of `head` followed by `rest`.
pub(crate) fn extend_accessor(head: Vec<Expr>, rest: &[Expr]) -> Expr {
    let mut segments = head;
    segments.extend(rest.iter().cloned());
    engine().build_accessor(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_codes_roundtrip_through_classification() {
        assert_eq!(Relation::Unrelated.code(), 0);
        assert_eq!(Relation::MutationIsAncestor.code(), 1);
        assert_eq!(Relation::Exact.code(), 2);
        assert_eq!(Relation::MutationIsDescendant(2).code(), 4);
        assert_eq!(Relation::from_code(3), Relation::MutationIsDescendant(1));
    }

    #[test]
    fn test_display() {
        let expr = parse_expr("a.b[0]['x y'][i]").unwrap();
        assert_eq!(expr.to_string(), "a.b[0]['x y'][i]");
    }

    #[test]
    fn test_resolve_dynamic_segment() {
        let scope = Value::from(serde_json::json!({"i": 2, "list": [0, 1, 2]}));
        let expr = parse_expr("list[i]").unwrap();
        let keys = engine().resolve(&expr, &scope).unwrap();
        assert_eq!(keys, vec![Key::Name("list".into()), Key::Index(2)]);
    }
}
