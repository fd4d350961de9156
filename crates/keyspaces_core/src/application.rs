//! Two-keyspace application wiring.
//!
//! # Responsibility
//! - Build one stack per configured keyspace from its namespaces.
//! - Expose the repositories of both keyspaces.
//!
//! # Invariants
//! - The first keyspace manages `keyspace1` + `global` entities, the second
//!   `keyspace2` + `global` entities.
//! - Every repository is bound to its own stack's session.

use crate::cql::Cluster;
use crate::model::global::{self, Keyspace1CRepository, Keyspace2CRepository};
use crate::model::keyspace1::{self, ARepository};
use crate::model::keyspace2::{self, BRepository};
use crate::repo::EntityRepository;
use crate::settings::Settings;
use crate::stack::{BootstrapResult, KeyspaceStack};
use log::info;

/// Running application: both keyspace stacks and their repositories.
pub struct Application {
    keyspace1: KeyspaceStack,
    keyspace2: KeyspaceStack,
    a_repository: ARepository,
    keyspace1_c_repository: Keyspace1CRepository,
    b_repository: BRepository,
    keyspace2_c_repository: Keyspace2CRepository,
}

impl Application {
    /// Validates `settings`, then bootstraps the first and the second
    /// keyspace in that order. The first failure aborts startup.
    pub async fn bootstrap(settings: &Settings, cluster: &dyn Cluster) -> BootstrapResult<Self> {
        settings.validate()?;

        let keyspace1 = KeyspaceStack::bootstrap(
            cluster,
            &settings.cassandra,
            settings.a.keyspace()?,
            &[keyspace1::namespace(), global::namespace()],
        )
        .await?;
        let keyspace2 = KeyspaceStack::bootstrap(
            cluster,
            &settings.cassandra,
            settings.b.keyspace()?,
            &[keyspace2::namespace(), global::namespace()],
        )
        .await?;

        let application = Self {
            a_repository: keyspace1.repository()?,
            keyspace1_c_repository: keyspace1.repository()?,
            b_repository: keyspace2.repository()?,
            keyspace2_c_repository: keyspace2.repository()?,
            keyspace1,
            keyspace2,
        };
        info!(
            "event=app_bootstrap module=application status=ok keyspace1={} keyspace2={}",
            application.keyspace1.keyspace(),
            application.keyspace2.keyspace()
        );
        Ok(application)
    }

    pub fn keyspace1(&self) -> &KeyspaceStack {
        &self.keyspace1
    }

    pub fn keyspace2(&self) -> &KeyspaceStack {
        &self.keyspace2
    }

    pub fn a_repository(&self) -> &ARepository {
        &self.a_repository
    }

    pub fn keyspace1_c_repository(&self) -> &Keyspace1CRepository {
        &self.keyspace1_c_repository
    }

    pub fn b_repository(&self) -> &BRepository {
        &self.b_repository
    }

    pub fn keyspace2_c_repository(&self) -> &Keyspace2CRepository {
        &self.keyspace2_c_repository
    }

    /// Deletes every row of every repository in both keyspaces.
    pub async fn purge(&self) -> BootstrapResult<()> {
        self.a_repository.delete_all().await?;
        self.keyspace1_c_repository.delete_all().await?;
        self.b_repository.delete_all().await?;
        self.keyspace2_c_repository.delete_all().await?;
        info!(
            "event=app_purge module=application status=ok keyspace1={} keyspace2={}",
            self.keyspace1.keyspace(),
            self.keyspace2.keyspace()
        );
        Ok(())
    }
}
