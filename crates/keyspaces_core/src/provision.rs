//! Keyspace-bound session bootstrap.
//!
//! # Responsibility
//! - Open an unbound system session and make sure the target keyspace
//!   exists.
//! - Open and return the session bound to that keyspace.
//!
//! # Invariants
//! - Keyspace creation is `IF NOT EXISTS` with durable writes, so repeated
//!   provisioning is idempotent.
//! - With keyspace creation disabled, binding to a missing keyspace fails.
//!
//! Keyspace creation is meant for dev/test clusters only.

use crate::cql::{Cluster, CqlSession, Statement, StoreResult};
use crate::keyspace::KeyspaceName;
use crate::settings::ClusterSettings;
use crate::stack::{BootstrapError, BootstrapResult};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

/// Opens keyspace-bound sessions against one cluster.
pub struct SessionProvisioner<'a> {
    cluster: &'a dyn Cluster,
    settings: &'a ClusterSettings,
}

impl<'a> SessionProvisioner<'a> {
    pub fn new(cluster: &'a dyn Cluster, settings: &'a ClusterSettings) -> Self {
        Self { cluster, settings }
    }

    /// Returns a session bound to `keyspace`, creating the keyspace first
    /// when `create-keyspaces` is enabled.
    ///
    /// # Side effects
    /// - Emits `session_provision` logging events with duration and status.
    pub async fn provision(&self, keyspace: &KeyspaceName) -> BootstrapResult<Arc<dyn CqlSession>> {
        let started_at = Instant::now();
        info!(
            "event=session_provision module=provision status=start keyspace={keyspace} create_keyspace={}",
            self.settings.create_keyspaces
        );

        match self.open_bound(keyspace).await {
            Ok(session) => {
                info!(
                    "event=session_provision module=provision status=ok keyspace={keyspace} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(session)
            }
            Err(err) => {
                error!(
                    "event=session_provision module=provision status=error keyspace={keyspace} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    async fn open_bound(&self, keyspace: &KeyspaceName) -> BootstrapResult<Arc<dyn CqlSession>> {
        let options = self.settings.connect_options()?;
        if self.settings.create_keyspaces {
            let system = self.cluster.connect(&options).await?;
            self.ensure_keyspace(system.as_ref(), keyspace).await?;
        }
        self.cluster
            .connect(&options.bound_to(keyspace.clone()))
            .await
            .map_err(BootstrapError::from)
    }

    /// Runs `CREATE KEYSPACE IF NOT EXISTS` on `system`.
    pub async fn ensure_keyspace(
        &self,
        system: &dyn CqlSession,
        keyspace: &KeyspaceName,
    ) -> StoreResult<()> {
        system
            .execute(&Statement::CreateKeyspace {
                keyspace: keyspace.clone(),
                replication: self.settings.replication(),
                durable_writes: true,
                if_not_exists: true,
            })
            .await?;
        Ok(())
    }
}
