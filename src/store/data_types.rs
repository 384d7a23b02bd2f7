//! Declared data types.
//!
//! A development-time schema over a store's top-level keys. Checking stops
//! at the first mismatch; the result is a [`Diagnostic`] for the host to
//! judge.

use indexmap::IndexMap;

use crate::diagnostics::Diagnostic;
use crate::types::Value;

/// Expected shape of one value.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Any,
    Bool,
    Number,
    String,
    Date,
    Array,
    Object,
    ArrayOf(Box<DataType>),
    OneOf(Vec<DataType>),
}

impl DataType {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (DataType::Any, _) => true,
            (DataType::Bool, Value::Bool(_))
            | (DataType::Number, Value::Number(_))
            | (DataType::String, Value::String(_))
            | (DataType::Date, Value::Date(_))
            | (DataType::Array, Value::Array(_))
            | (DataType::Object, Value::Object(_)) => true,
            (DataType::ArrayOf(item), Value::Array(items)) => items.iter().all(|v| item.matches(v)),
            (DataType::OneOf(options), v) => options.iter().any(|t| t.matches(v)),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            DataType::Any => "any".into(),
            DataType::Bool => "bool".into(),
            DataType::Number => "number".into(),
            DataType::String => "string".into(),
            DataType::Date => "date".into(),
            DataType::Array => "array".into(),
            DataType::Object => "object".into(),
            DataType::ArrayOf(item) => format!("array of {}", item.describe()),
            DataType::OneOf(options) => options
                .iter()
                .map(DataType::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FieldType {
    ty: DataType,
    required: bool,
}

/// Schema for a component's data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypes {
    component: String,
    fields: IndexMap<String, FieldType>,
}

impl DataTypes {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            fields: IndexMap::new(),
        }
    }

    /// Optional key: absent or null is accepted.
    pub fn field(mut self, key: impl Into<String>, ty: DataType) -> Self {
        self.fields.insert(key.into(), FieldType { ty, required: false });
        self
    }

    /// Required key.
    pub fn required(mut self, key: impl Into<String>, ty: DataType) -> Self {
        self.fields.insert(key.into(), FieldType { ty, required: true });
        self
    }

    /// Schema relabeled for another component name.
    pub(crate) fn for_component(&self, component: &str) -> Self {
        Self {
            component: component.to_string(),
            fields: self.fields.clone(),
        }
    }

    /// Validate top-level keys, stopping at the first mismatch.
    pub fn check(&self, data: &Value) -> Result<(), Diagnostic> {
        for (key, field) in &self.fields {
            let value = data
                .as_object()
                .and_then(|map| map.get(key))
                .unwrap_or(&Value::Null);

            if value.is_null() {
                if field.required {
                    return Err(Diagnostic::MissingRequired {
                        component: self.component.clone(),
                        key: key.clone(),
                    });
                }
                continue;
            }

            if !field.ty.matches(value) {
                return Err(Diagnostic::SchemaMismatch {
                    component: self.component.clone(),
                    key: key.clone(),
                    expected: field.ty.describe(),
                    found: value.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}
