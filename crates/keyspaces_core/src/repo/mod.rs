//! Repository layer abstractions and the CQL implementation.
//!
//! # Responsibility
//! - Define the persistence contract every keyspace-scoped repository offers.
//! - Keep statement building inside the persistence boundary.
//!
//! # Invariants
//! - A repository reads and writes through exactly one keyspace session.
//! - Repositories for different keyspaces share no runtime state.

use crate::cql::StoreError;
use crate::mapping::{Entity, MappingError};
use async_trait::async_trait;
use thiserror::Error;

pub mod cassandra_repo;

pub use cassandra_repo::CassandraRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for entity persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("expected at most one `{entity}` row, found {found}")]
    IncorrectResultSize { entity: &'static str, found: usize },
    #[error("invalid result for table `{table}`: {message}")]
    InvalidData {
        table: &'static str,
        message: String,
    },
}

/// Basic CRUD contract for one entity type in one keyspace.
#[async_trait]
pub trait EntityRepository<E: Entity>: Send + Sync {
    /// Writes `entity`; an existing row with the same primary key is
    /// overwritten.
    async fn insert(&self, entity: &E) -> RepoResult<()>;

    async fn insert_all(&self, entities: &[E]) -> RepoResult<()> {
        for entity in entities {
            self.insert(entity).await?;
        }
        Ok(())
    }

    /// Same as `insert`: CQL writes are upserts.
    async fn save(&self, entity: &E) -> RepoResult<()> {
        self.insert(entity).await
    }

    async fn find_all(&self) -> RepoResult<Vec<E>>;

    async fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<E>>;

    async fn find_by_partition(&self, partition: &E::PartitionKey) -> RepoResult<Vec<E>>;

    /// The single row of a partition.
    ///
    /// Returns `IncorrectResultSize` when the partition holds several rows.
    async fn find_one_by_partition(&self, partition: &E::PartitionKey) -> RepoResult<Option<E>>;

    async fn exists_by_id(&self, id: &E::Id) -> RepoResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn count(&self) -> RepoResult<u64>;

    async fn delete_by_id(&self, id: &E::Id) -> RepoResult<()>;

    async fn delete(&self, entity: &E) -> RepoResult<()>;

    async fn delete_all(&self) -> RepoResult<()>;
}
