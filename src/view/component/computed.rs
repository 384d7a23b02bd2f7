//! Computed properties.
//!
//! A computed function reads data through a [`ComputedScope`], which
//! records every expression it reads. Dependencies are discovered during
//! evaluation, never declared:
//!
//! - the dependency set of a computed is replaced on every evaluation
//! - a watch is installed the first time an expression is seen, and stays
//! - a watch whose expression left the current set does nothing
//!
//! Reading a computed that has never been evaluated evaluates it first.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::expr::{parse_expr, Expr};
use crate::types::Value;
use crate::view::node::relation;

use super::Component;

/// Dependency bookkeeping for one computed property.
#[derive(Debug, Default)]
pub(crate) struct ComputedDeps {
    /// Expressions read by the latest evaluation.
    pub(crate) current: HashSet<String>,
    /// Expressions with an installed watch.
    pub(crate) watched: HashSet<String>,
}

/// Read access handed to a computed function.
pub struct ComputedScope {
    component: Component,
    name: String,
    reads: RefCell<Vec<String>>,
}

impl ComputedScope {
    /// Value of `expr` in the component's data, recorded as a dependency.
    ///
    /// # Panics
    ///
    /// Panics when `expr` is empty.
    pub fn get(&self, expr: &str) -> Value {
        assert!(
            !expr.trim().is_empty(),
            "computed `{}` called get without an expression",
            self.name
        );

        let first_read = !self.reads.borrow().iter().any(|r| r == expr);
        if first_read {
            self.reads.borrow_mut().push(expr.to_string());

            let pending_computed = self.component.class().computed_fn(expr).is_some()
                && !self.component.0.computed_deps.borrow().contains_key(expr);
            if pending_computed {
                self.component.calc_computed(expr);
            }
        }

        match parse_expr(expr) {
            Ok(parsed) => self.component.0.data.get(&parsed),
            Err(err) => {
                tracing::warn!(
                    computed = %self.name,
                    %err,
                    "computed read an unparsable expression"
                );
                Value::Null
            }
        }
    }

    /// Name of the computed being evaluated.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component the computed belongs to.
    pub fn component(&self) -> &Component {
        &self.component
    }
}

impl Component {
    /// Evaluate the computed `name` and write its value into data.
    pub(crate) fn calc_computed(&self, name: &str) {
        let Some(compute) = self.0.class.computed_fn(name) else {
            return;
        };
        self.0
            .computed_deps
            .borrow_mut()
            .entry(name.to_string())
            .or_default();

        let scope = ComputedScope {
            component: self.clone(),
            name: name.to_string(),
            reads: RefCell::new(Vec::new()),
        };
        let value = compute(&scope);
        let reads = scope.reads.into_inner();

        let new_watches: Vec<String> = {
            let mut all = self.0.computed_deps.borrow_mut();
            let deps = all.entry(name.to_string()).or_default();
            deps.current = reads.iter().cloned().collect();
            reads
                .into_iter()
                .filter(|expr| deps.watched.insert(expr.clone()))
                .collect()
        };
        for expr in new_watches {
            self.watch_dependency(name, &expr);
        }

        self.0.data.set(&Expr::path(&[name]), value, None);
    }

    fn watch_dependency(&self, name: &str, dependency: &str) {
        let Ok(parsed) = parse_expr(dependency) else {
            return;
        };
        let weak = Rc::downgrade(&self.0);
        let name = name.to_string();
        let dependency = dependency.to_string();

        self.0.data.listen(move |change| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let me = Component(inner);
            if !relation(change, &parsed, &me.0.data).is_related() {
                return;
            }
            let live = me
                .0
                .computed_deps
                .borrow()
                .get(&name)
                .is_some_and(|deps| deps.current.contains(&dependency));
            if live {
                me.calc_computed(&name);
            }
        });
    }

    /// Dependencies read by the latest evaluation of computed `name`.
    pub fn computed_dependencies(&self, name: &str) -> Vec<String> {
        let mut deps: Vec<String> = self
            .0
            .computed_deps
            .borrow()
            .get(name)
            .map(|deps| deps.current.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        deps
    }
}
