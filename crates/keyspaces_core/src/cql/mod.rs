//! CQL driver seam.
//!
//! # Responsibility
//! - Define the session/cluster contracts the persistence stacks run on.
//! - Host the two backends: the `scylla` driver for real clusters and an
//!   in-memory cluster for tests and offline demos.
//!
//! # Invariants
//! - A session is bound to at most one keyspace for its whole lifetime.
//! - Sessions are shared (`Arc`) and safe to use from many tasks.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;

pub mod driver;
pub mod memory;
pub mod statement;
pub mod value;

use crate::keyspace::KeyspaceName;
pub use statement::{ColumnKind, ColumnSpec, Restriction, Statement, TableSpec};
pub use value::{CqlType, CqlValue, Row};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while connecting to or querying the cluster.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no contact points configured")]
    NoContactPoints,
    #[error("authentication failed for user `{0}`")]
    Authentication(String),
    #[error("keyspace `{0}` does not exist")]
    KeyspaceNotFound(String),
    #[error("keyspace `{0}` already exists")]
    KeyspaceExists(String),
    #[error("table `{keyspace}.{table}` does not exist")]
    TableNotFound { keyspace: String, table: String },
    #[error("table `{keyspace}.{table}` already exists")]
    TableExists { keyspace: String, table: String },
    #[error("no keyspace has been specified for this session")]
    Unbound,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("unsupported CQL value in column {index}: {detail}")]
    UnsupportedValue { index: usize, detail: String },
    #[error("in-memory cluster state is poisoned")]
    Poisoned,
    #[error("failed to open session: {0}")]
    NewSession(#[from] ::scylla::transport::errors::NewSessionError),
    #[error("query failed: {0}")]
    Query(#[from] ::scylla::transport::errors::QueryError),
}

/// Shared login for every keyspace session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Everything a backend needs to open one session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// `host:port` entries.
    pub contact_points: Vec<String>,
    pub local_datacenter: String,
    pub credentials: Option<Credentials>,
    /// `None` opens an unbound "system" session.
    pub keyspace: Option<KeyspaceName>,
}

impl ConnectOptions {
    /// Same connection settings, bound to `keyspace`.
    pub fn bound_to(&self, keyspace: KeyspaceName) -> Self {
        Self {
            keyspace: Some(keyspace),
            ..self.clone()
        }
    }
}

/// A connection to the cluster, optionally bound to one keyspace.
#[async_trait]
pub trait CqlSession: Send + Sync {
    fn keyspace(&self) -> Option<&KeyspaceName>;

    async fn execute(&self, statement: &Statement) -> StoreResult<Vec<Row>>;
}

/// Factory for sessions against one cluster.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn connect(&self, options: &ConnectOptions) -> StoreResult<Arc<dyn CqlSession>>;
}
