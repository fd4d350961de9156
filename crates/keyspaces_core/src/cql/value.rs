//! Column types and values exchanged with a CQL session.

use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// CQL column types the mapping layer knows how to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CqlType {
    Uuid,
    Text,
    BigInt,
    Int,
    Boolean,
}

impl CqlType {
    pub fn as_cql(self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::BigInt => "bigint",
            Self::Int => "int",
            Self::Boolean => "boolean",
        }
    }
}

impl Display for CqlType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_cql())
    }
}

/// A single non-null cell value.
///
/// Ordered so that backends can keep primary keys in sorted maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CqlValue {
    Uuid(Uuid),
    Text(String),
    BigInt(i64),
    Int(i32),
    Boolean(bool),
}

impl CqlValue {
    pub fn cql_type(&self) -> CqlType {
        match self {
            Self::Uuid(_) => CqlType::Uuid,
            Self::Text(_) => CqlType::Text,
            Self::BigInt(_) => CqlType::BigInt,
            Self::Int(_) => CqlType::Int,
            Self::Boolean(_) => CqlType::Boolean,
        }
    }
}

impl From<Uuid> for CqlValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<String> for CqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<i32> for CqlValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for CqlValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Positional result row; `None` is a CQL null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    values: Vec<Option<CqlValue>>,
}

impl Row {
    pub fn new(values: Vec<Option<CqlValue>>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&CqlValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<CqlValue>] {
        &self.values
    }
}
