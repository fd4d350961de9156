//! One keyspace's persistence stack.
//!
//! # Responsibility
//! - Wire a keyspace-bound session, a mapping context built from the
//!   stack's namespaces, its converter and its schema manager.
//! - Hand out repositories for entities the context manages.
//!
//! # Invariants
//! - Stacks share no session, context or converter with each other.
//! - `repository::<E>()` fails for entities outside the stack's namespaces.

use crate::cql::{Cluster, CqlSession, StoreError};
use crate::keyspace::KeyspaceName;
use crate::mapping::{
    Entity, EntityConverter, EntityNamespace, MappingContext, MappingError, SchemaAction,
    SchemaError, SchemaManager,
};
use crate::provision::SessionProvisioner;
use crate::repo::{CassandraRepository, RepoError};
use crate::settings::{ClusterSettings, SettingsError};
use log::info;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Startup failure of a keyspace stack or of the whole application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Session, mapping and schema handling for one keyspace.
pub struct KeyspaceStack {
    keyspace: KeyspaceName,
    session: Arc<dyn CqlSession>,
    converter: EntityConverter,
}

impl KeyspaceStack {
    /// Scans `namespaces`, provisions the keyspace session and applies the
    /// configured schema action.
    ///
    /// Mapping errors surface before any connection is opened.
    pub async fn bootstrap(
        cluster: &dyn Cluster,
        settings: &ClusterSettings,
        keyspace: KeyspaceName,
        namespaces: &[EntityNamespace],
    ) -> BootstrapResult<Self> {
        let started_at = Instant::now();
        let context = Arc::new(MappingContext::scan(namespaces)?);
        let session = SessionProvisioner::new(cluster, settings)
            .provision(&keyspace)
            .await?;
        let stack = Self::from_parts(keyspace, session, context);
        stack.apply_schema(settings.schema_action).await?;
        info!(
            "event=stack_bootstrap module=stack status=ok keyspace={} entities={} duration_ms={}",
            stack.keyspace,
            stack.converter.context().entities().len(),
            started_at.elapsed().as_millis()
        );
        Ok(stack)
    }

    /// Builds a stack over an already provisioned session.
    pub fn from_parts(
        keyspace: KeyspaceName,
        session: Arc<dyn CqlSession>,
        context: Arc<MappingContext>,
    ) -> Self {
        Self {
            keyspace,
            session,
            converter: EntityConverter::new(context),
        }
    }

    pub fn keyspace(&self) -> &KeyspaceName {
        &self.keyspace
    }

    pub fn session(&self) -> Arc<dyn CqlSession> {
        Arc::clone(&self.session)
    }

    pub fn converter(&self) -> &EntityConverter {
        &self.converter
    }

    pub fn context(&self) -> &MappingContext {
        self.converter.context()
    }

    pub fn schema(&self) -> SchemaManager<'_> {
        SchemaManager::new(self.session.as_ref(), self.converter.context())
    }

    pub async fn apply_schema(&self, action: SchemaAction) -> BootstrapResult<()> {
        self.schema().apply(action).await?;
        Ok(())
    }

    /// Repository for `E` in this keyspace.
    pub fn repository<E: Entity>(&self) -> Result<CassandraRepository<E>, MappingError> {
        CassandraRepository::new(self.session(), self.converter.clone())
    }
}
