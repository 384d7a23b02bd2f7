//! Default expression engine: property-access paths and literals.
//!
//! Grammar:
//!
//! ```text
//! expr     := literal | accessor
//! literal  := 'text' | "text" | number | true | false | null
//! accessor := ident ( '.' ident | '[' ( number | string | accessor ) ']' )*
//! ```

use super::{Expr, ExprEngine, Relation};
use crate::error::{CoreError, Result};
use crate::types::{Key, Value};

/// Path-only [`ExprEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEngine;

impl ExprEngine for PathEngine {
    fn parse(&self, text: &str) -> Result<Expr> {
        let mut parser = Parser { src: text, pos: 0 };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos < text.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn evaluate(&self, expr: &Expr, scope: &Value) -> Value {
        match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Accessor(_) => match self.resolve(expr, scope) {
                Some(keys) => scope.at_path(&keys),
                None => Value::Null,
            },
        }
    }

    fn compare(&self, change: &Expr, target: &Expr, scope: &Value) -> Relation {
        let Expr::Accessor(paths) = target else {
            return Relation::Unrelated;
        };
        let change_paths = change.paths();

        let mut matched = true;
        for (i, seg) in paths.iter().enumerate() {
            let static_key = seg.static_key();

            // A changed dynamic segment invalidates the whole target.
            if static_key.is_none() && self.compare(change, seg, scope).is_related() {
                return Relation::MutationIsAncestor;
            }

            if matched && i < change_paths.len() {
                let key = match static_key {
                    Some(key) => Some(key),
                    None => Expr::Literal(self.evaluate(seg, scope)).static_key(),
                };
                let change_key = change_paths[i].static_key();
                if key.map(|k| k.as_name()) != change_key.map(|k| k.as_name()) {
                    matched = false;
                }
            }
        }

        if !matched {
            return Relation::Unrelated;
        }
        let code = (change_paths.len() as isize - paths.len() as isize + 2).max(1);
        Relation::from_code(code as usize)
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> CoreError {
        CoreError::Parse {
            input: self.src.to_string(),
            message: format!("{message} at offset {}", self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => Ok(Expr::Literal(Value::String(self.string()?))),
            Some(c) if c.is_ascii_digit() || c == '-' => {
                Ok(Expr::Literal(Value::Number(self.number()?)))
            }
            Some(c) if is_ident_start(c) => {
                let name = self.ident();
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                    _ => self.accessor(name),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("empty expression")),
        }
    }

    fn accessor(&mut self, head: String) -> Result<Expr> {
        let mut paths = vec![Expr::Literal(Value::String(head))];
        loop {
            self.skip_ws();
            match self.peek() {
                Some('.') => {
                    self.bump();
                    self.skip_ws();
                    if !self.peek().is_some_and(is_ident_start) {
                        return Err(self.error("expected property name"));
                    }
                    paths.push(Expr::Literal(Value::String(self.ident())));
                }
                Some('[') => {
                    self.bump();
                    let inner = self.expr()?;
                    self.skip_ws();
                    if self.bump() != Some(']') {
                        return Err(self.error("expected `]`"));
                    }
                    paths.push(inner);
                }
                _ => return Ok(Expr::Accessor(paths)),
            }
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn string(&mut self) -> Result<String> {
        let quote = self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if Some(c) == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| self.error("invalid number"))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

/// Accessor for resolved keys; used for change record paths.
pub(crate) fn accessor_from_keys(keys: &[Key]) -> Expr {
    Expr::Accessor(
        keys.iter()
            .map(|key| match key {
                Key::Name(name) => Expr::Literal(Value::String(name.clone())),
                Key::Index(index) => Expr::Literal(Value::Number(*index as f64)),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Expr {
        PathEngine.parse(text).unwrap()
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(parse("a.b"), Expr::path(&["a", "b"]));
        assert_eq!(
            parse("list[0]"),
            Expr::Accessor(vec![
                Expr::Literal(Value::from("list")),
                Expr::Literal(Value::Number(0.0)),
            ])
        );
        assert_eq!(parse("'header'"), Expr::Literal(Value::from("header")));
        assert_eq!(parse(" true "), Expr::Literal(Value::Bool(true)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(PathEngine.parse("").is_err());
        assert!(PathEngine.parse("a.").is_err());
        assert!(PathEngine.parse("a[0").is_err());
        assert!(PathEngine.parse("a b").is_err());
    }

    #[test]
    fn test_evaluate() {
        let scope = Value::from(json!({"user": {"name": "ada"}, "list": [4, 5], "i": 1}));
        assert_eq!(PathEngine.evaluate(&parse("user.name"), &scope), Value::from("ada"));
        assert_eq!(PathEngine.evaluate(&parse("list[i]"), &scope), Value::from(5));
        assert_eq!(PathEngine.evaluate(&parse("missing.deep"), &scope), Value::Null);
    }

    #[test]
    fn test_compare_classification() {
        let scope = Value::object();
        let target = parse("a.b");

        assert_eq!(PathEngine.compare(&parse("a.b"), &target, &scope), Relation::Exact);
        assert_eq!(PathEngine.compare(&parse("a"), &target, &scope), Relation::MutationIsAncestor);
        assert_eq!(
            PathEngine.compare(&parse("a.b.c.d"), &target, &scope),
            Relation::MutationIsDescendant(2)
        );
        assert_eq!(PathEngine.compare(&parse("a.c"), &target, &scope), Relation::Unrelated);
        assert_eq!(PathEngine.compare(&parse("x"), &target, &scope), Relation::Unrelated);
    }

    #[test]
    fn test_compare_index_keys() {
        let scope = Value::object();
        let change = accessor_from_keys(&[Key::Name("list".into()), Key::Index(0)]);

        assert_eq!(PathEngine.compare(&change, &parse("list[0]"), &scope), Relation::Exact);
        assert_eq!(PathEngine.compare(&change, &parse("list[1]"), &scope), Relation::Unrelated);
        assert_eq!(
            PathEngine.compare(&change, &parse("list"), &scope),
            Relation::MutationIsDescendant(1)
        );
    }

    #[test]
    fn test_compare_dynamic_segment() {
        let scope = Value::from(json!({"i": 0, "list": [1]}));
        let target = parse("list[i]");

        // Changing the index variable invalidates the whole target.
        assert_eq!(PathEngine.compare(&parse("i"), &target, &scope), Relation::MutationIsAncestor);
        // The dynamic segment is evaluated in scope when matching.
        let change = accessor_from_keys(&[Key::Name("list".into()), Key::Index(0)]);
        assert_eq!(PathEngine.compare(&change, &target, &scope), Relation::Exact);
    }

    #[test]
    fn test_literal_target_unrelated() {
        let scope = Value::object();
        assert_eq!(
            PathEngine.compare(&parse("a"), &parse("'a'"), &scope),
            Relation::Unrelated
        );
    }
}
