//! Keyspace identity and replication options.
//!
//! # Responsibility
//! - Validate CQL identifiers used for keyspaces, tables and columns.
//! - Describe keyspace replication for `CREATE KEYSPACE` statements.
//!
//! # Invariants
//! - A `KeyspaceName` is always a valid, lowercase, unquoted CQL identifier.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Unquoted CQL identifiers: letter first, at most 48 chars.
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,47}$").expect("identifier regex is valid"));

/// Raised when a keyspace, table or column name is not a usable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} name `{value}`: expected [A-Za-z][A-Za-z0-9_]{{0,47}}")]
pub struct IdentifierError {
    pub kind: &'static str,
    pub value: String,
}

/// Checks `value` against the unquoted CQL identifier grammar.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if IDENTIFIER_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(IdentifierError {
            kind,
            value: value.to_string(),
        })
    }
}

/// Name of one isolated keyspace in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyspaceName {
    name: Cow<'static, str>,
}

impl KeyspaceName {
    /// Parses and lowercases a keyspace name.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        validate_identifier("keyspace", trimmed)?;
        Ok(Self {
            name: Cow::Owned(trimmed.to_ascii_lowercase()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl Display for KeyspaceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl TryFrom<String> for KeyspaceName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyspaceName> for String {
    fn from(value: KeyspaceName) -> Self {
        value.name.into_owned()
    }
}

/// Replication strategy used when a keyspace is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replication {
    /// `SimpleStrategy`, for single-datacenter dev/test clusters.
    Simple { replication_factor: u32 },
    /// `NetworkTopologyStrategy` with a factor per datacenter.
    NetworkTopology { datacenters: BTreeMap<String, u32> },
}

impl Default for Replication {
    fn default() -> Self {
        Self::Simple {
            replication_factor: 1,
        }
    }
}

impl Display for Replication {
    /// Renders the CQL replication map literal.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple { replication_factor } => write!(
                f,
                "{{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
            ),
            Self::NetworkTopology { datacenters } => {
                write!(f, "{{'class': 'NetworkTopologyStrategy'")?;
                for (datacenter, factor) in datacenters {
                    write!(f, ", '{datacenter}': {factor}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyspaceName, Replication};
    use std::collections::BTreeMap;

    #[test]
    fn parse_lowercases_and_trims() {
        let name = KeyspaceName::parse("  A_Keyspace ").unwrap();
        assert_eq!(name.as_str(), "a_keyspace");
        assert_eq!(name.to_string(), "a_keyspace");
    }

    #[test]
    fn parse_rejects_invalid_identifiers() {
        for raw in ["", "1abc", "with-dash", "quoted\"", &"k".repeat(49)] {
            let err = KeyspaceName::parse(raw).unwrap_err();
            assert_eq!(err.kind, "keyspace");
        }
    }

    #[test]
    fn replication_renders_cql_map() {
        assert_eq!(
            Replication::default().to_string(),
            "{'class': 'SimpleStrategy', 'replication_factor': 1}"
        );

        let mut datacenters = BTreeMap::new();
        datacenters.insert("dc1".to_string(), 3);
        datacenters.insert("dc2".to_string(), 2);
        assert_eq!(
            Replication::NetworkTopology { datacenters }.to_string(),
            "{'class': 'NetworkTopologyStrategy', 'dc1': 3, 'dc2': 2}"
        );
    }
}
