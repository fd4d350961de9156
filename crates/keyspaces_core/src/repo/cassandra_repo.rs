//! Entity repository over a keyspace-bound CQL session.
//!
//! # Responsibility
//! - Turn repository calls into CQL statements for the entity's table.
//! - Convert result rows through the keyspace's entity converter.
//!
//! # Invariants
//! - Statements use unqualified table names, so they always resolve in the
//!   keyspace the session is bound to.

use super::{EntityRepository, RepoError, RepoResult};
use crate::cql::{CqlSession, CqlValue, Restriction, Statement};
use crate::mapping::{Entity, EntityConverter, MappingResult, TableDescriptor};
use async_trait::async_trait;
use log::debug;
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// Repository for entity `E` inside one keyspace.
pub struct CassandraRepository<E: Entity> {
    session: Arc<dyn CqlSession>,
    converter: EntityConverter,
    descriptor: &'static TableDescriptor,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for CassandraRepository<E> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            converter: self.converter.clone(),
            descriptor: self.descriptor,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> CassandraRepository<E> {
    /// Fails with `EntityNotManaged` when the converter's context does not
    /// map `E`.
    pub fn new(session: Arc<dyn CqlSession>, converter: EntityConverter) -> MappingResult<Self> {
        let descriptor = converter.descriptor::<E>()?;
        Ok(Self {
            session,
            converter,
            descriptor,
            _entity: PhantomData,
        })
    }

    /// Keyspace this repository writes to.
    pub fn keyspace(&self) -> Option<&str> {
        self.session.keyspace().map(|keyspace| keyspace.as_str())
    }

    pub fn table(&self) -> &'static str {
        self.descriptor.table
    }

    async fn select(&self, restrictions: Vec<Restriction>, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let rows = self
            .session
            .execute(&Statement::Select {
                table: self.descriptor.table.to_string(),
                columns: self.descriptor.column_names(),
                restrictions,
                limit,
            })
            .await?;
        debug!(
            "event=repo_select module=repo table={} keyspace={} rows={}",
            self.descriptor.table,
            self.keyspace().unwrap_or("<system>"),
            rows.len()
        );
        rows.iter()
            .map(|row| self.converter.read::<E>(row).map_err(RepoError::from))
            .collect()
    }

    async fn delete_where(&self, restrictions: Vec<Restriction>) -> RepoResult<()> {
        self.session
            .execute(&Statement::Delete {
                table: self.descriptor.table.to_string(),
                restrictions,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> EntityRepository<E> for CassandraRepository<E> {
    async fn insert(&self, entity: &E) -> RepoResult<()> {
        let values = self.converter.write(entity)?;
        self.session
            .execute(&Statement::Insert {
                table: self.descriptor.table.to_string(),
                columns: self.descriptor.column_names(),
                values,
            })
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> RepoResult<Vec<E>> {
        self.select(Vec::new(), None).await
    }

    async fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<E>> {
        let restrictions = self.converter.id_restrictions::<E>(id)?;
        Ok(self.select(restrictions, Some(1)).await?.into_iter().next())
    }

    async fn find_by_partition(&self, partition: &E::PartitionKey) -> RepoResult<Vec<E>> {
        let restrictions = self.converter.partition_restrictions::<E>(partition)?;
        self.select(restrictions, None).await
    }

    async fn find_one_by_partition(&self, partition: &E::PartitionKey) -> RepoResult<Option<E>> {
        let restrictions = self.converter.partition_restrictions::<E>(partition)?;
        let mut found = self.select(restrictions, Some(2)).await?;
        if found.len() > 1 {
            return Err(RepoError::IncorrectResultSize {
                entity: type_name::<E>(),
                found: found.len(),
            });
        }
        Ok(found.pop())
    }

    async fn count(&self) -> RepoResult<u64> {
        let rows = self
            .session
            .execute(&Statement::Count {
                table: self.descriptor.table.to_string(),
                restrictions: Vec::new(),
            })
            .await?;
        match rows.first().and_then(|row| row.get(0)) {
            Some(CqlValue::BigInt(count)) if *count >= 0 => Ok(*count as u64),
            other => Err(RepoError::InvalidData {
                table: self.descriptor.table,
                message: format!("unexpected count value {other:?}"),
            }),
        }
    }

    async fn delete_by_id(&self, id: &E::Id) -> RepoResult<()> {
        let restrictions = self.converter.id_restrictions::<E>(id)?;
        self.delete_where(restrictions).await
    }

    async fn delete(&self, entity: &E) -> RepoResult<()> {
        let restrictions = self.converter.key_restrictions(entity)?;
        self.delete_where(restrictions).await
    }

    async fn delete_all(&self) -> RepoResult<()> {
        self.session
            .execute(&Statement::Truncate {
                table: self.descriptor.table.to_string(),
            })
            .await?;
        debug!(
            "event=repo_truncate module=repo table={} keyspace={}",
            self.descriptor.table,
            self.keyspace().unwrap_or("<system>")
        );
        Ok(())
    }
}
