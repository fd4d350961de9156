//! Entity types and the namespaces that group them.
//!
//! # Responsibility
//! - Define the records stored in each keyspace.
//! - Expose one `namespace()` registry per module; a keyspace stack is
//!   built from a list of these.
//!
//! # Invariants
//! - Every entity is identified by `(partition uuid, clustering text)`.
//! - `keyspace1` entities only live in the first keyspace, `keyspace2`
//!   entities only in the second, `global` entities in both.

pub mod global;
pub mod keyspace1;
pub mod keyspace2;
