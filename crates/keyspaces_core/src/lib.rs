//! Keyspace-isolated persistence over Cassandra-compatible clusters.
//! One shared cluster, one isolated stack (session, mapping, repositories)
//! per logical keyspace.

pub mod application;
pub mod cql;
pub mod keyspace;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod provision;
pub mod repo;
pub mod settings;
pub mod stack;

pub use application::Application;
pub use cql::driver::ScyllaCluster;
pub use cql::memory::MemoryCluster;
pub use cql::{Cluster, CqlSession, StoreError, StoreResult};
pub use keyspace::{KeyspaceName, Replication};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use mapping::{
    Entity, EntityConverter, EntityNamespace, MappingContext, MappingError, MappingResult,
    SchemaAction, SchemaError, SchemaManager,
};
pub use model::global::C;
pub use model::keyspace1::A;
pub use model::keyspace2::B;
pub use provision::SessionProvisioner;
pub use repo::{CassandraRepository, EntityRepository, RepoError, RepoResult};
pub use settings::{ClusterSettings, KeyspaceSettings, LoggingSettings, Settings, SettingsError};
pub use stack::{BootstrapError, BootstrapResult, KeyspaceStack};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
