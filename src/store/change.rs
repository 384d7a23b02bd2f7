//! Change records.
//!
//! Every mutation of a data store produces exactly one [`ChangeRecord`].
//! Records are shared as `Rc<ChangeRecord>` between listeners, batches and
//! child updates, and are never mutated after emission.

use std::rc::Rc;

use crate::expr::Expr;
use crate::types::{ComponentId, Value};

/// Shared, immutable change record.
pub type Change = Rc<ChangeRecord>;

/// Who caused a mutation, used to suppress update echoes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOrigin {
    pub id: ComponentId,
    pub prop: Option<String>,
}

impl ChangeOrigin {
    /// Origin naming only a component.
    pub fn component(id: ComponentId) -> Self {
        Self { id, prop: None }
    }

    /// Origin naming a component and the bound prop it wrote through.
    pub fn prop(id: ComponentId, prop: impl Into<String>) -> Self {
        Self {
            id,
            prop: Some(prop.into()),
        }
    }
}

/// What kind of mutation happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    Set {
        value: Value,
    },
    Splice {
        index: usize,
        delete_count: usize,
        insertions: Vec<Value>,
        removed: Vec<Value>,
    },
}

/// One data mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// Resolved accessor of the mutated location.
    pub expr: Expr,
    pub origin: Option<ChangeOrigin>,
}

impl ChangeRecord {
    pub fn is_splice(&self) -> bool {
        matches!(self.kind, ChangeKind::Splice { .. })
    }

    /// Value written by a SET.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            ChangeKind::Set { value } => Some(value),
            ChangeKind::Splice { .. } => None,
        }
    }

    /// Whether `id` caused this change (through `prop`, when given).
    pub fn is_from(&self, id: ComponentId, prop: Option<&str>) -> bool {
        match &self.origin {
            Some(origin) => origin.id == id && (prop.is_none() || origin.prop.as_deref() == prop),
            None => false,
        }
    }
}
