//! In-memory cluster backend.
//!
//! # Responsibility
//! - Execute structured statements against process-local keyspaces.
//! - Reproduce the CQL rules the repositories rely on: keyspace/table
//!   existence, upsert-by-primary-key, and partition-key restrictions.
//!
//! # Invariants
//! - Every keyspace owns its own tables; a table name never resolves across
//!   keyspaces.
//! - The state lock is never held across an await point.

use super::{
    Cluster, ColumnKind, ConnectOptions, CqlSession, CqlValue, Restriction, Row, Statement,
    StoreError, StoreResult, TableSpec,
};
use crate::keyspace::{KeyspaceName, Replication};
use async_trait::async_trait;
use log::debug;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type PrimaryKey = Vec<CqlValue>;

/// A process-local cluster shared by every session connected to it.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<ClusterState>,
}

#[derive(Default)]
struct ClusterState {
    credentials: Option<(String, SecretString)>,
    keyspaces: RwLock<BTreeMap<String, MemoryKeyspace>>,
}

struct MemoryKeyspace {
    replication: Replication,
    durable_writes: bool,
    tables: BTreeMap<String, MemoryTable>,
}

struct MemoryTable {
    spec: TableSpec,
    rows: BTreeMap<PrimaryKey, Vec<Option<CqlValue>>>,
}

/// Creation options recorded for a keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceOptions {
    pub replication: Replication,
    pub durable_writes: bool,
}

impl MemoryCluster {
    /// Cluster that accepts any login.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster that rejects sessions not presenting exactly these credentials.
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ClusterState {
                credentials: Some((username.into(), SecretString::new(password.into()))),
                keyspaces: RwLock::default(),
            }),
        }
    }

    pub fn keyspace_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.read()?.keys().cloned().collect())
    }

    pub fn keyspace_options(&self, keyspace: &str) -> StoreResult<Option<KeyspaceOptions>> {
        Ok(self
            .state
            .read()?
            .get(keyspace)
            .map(|keyspace| KeyspaceOptions {
                replication: keyspace.replication.clone(),
                durable_writes: keyspace.durable_writes,
            }))
    }

    pub fn table_names(&self, keyspace: &str) -> StoreResult<Vec<String>> {
        let keyspaces = self.state.read()?;
        let keyspace = keyspaces
            .get(keyspace)
            .ok_or_else(|| StoreError::KeyspaceNotFound(keyspace.to_string()))?;
        Ok(keyspace.tables.keys().cloned().collect())
    }

    fn authenticate(&self, options: &ConnectOptions) -> StoreResult<()> {
        let Some((username, password)) = &self.state.credentials else {
            return Ok(());
        };
        match &options.credentials {
            Some(given)
                if &given.username == username
                    && given.password.expose_secret() == password.expose_secret() =>
            {
                Ok(())
            }
            Some(given) => Err(StoreError::Authentication(given.username.clone())),
            None => Err(StoreError::Authentication(String::new())),
        }
    }
}

impl ClusterState {
    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, MemoryKeyspace>>> {
        self.keyspaces.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, MemoryKeyspace>>> {
        self.keyspaces.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn connect(&self, options: &ConnectOptions) -> StoreResult<Arc<dyn CqlSession>> {
        if options.contact_points.is_empty() {
            return Err(StoreError::NoContactPoints);
        }
        self.authenticate(options)?;

        if let Some(keyspace) = &options.keyspace {
            if !self.state.read()?.contains_key(keyspace.as_str()) {
                return Err(StoreError::KeyspaceNotFound(keyspace.to_string()));
            }
        }

        Ok(Arc::new(MemorySession {
            state: Arc::clone(&self.state),
            keyspace: options.keyspace.clone(),
        }))
    }
}

/// Session on a [`MemoryCluster`].
pub struct MemorySession {
    state: Arc<ClusterState>,
    keyspace: Option<KeyspaceName>,
}

#[async_trait]
impl CqlSession for MemorySession {
    fn keyspace(&self) -> Option<&KeyspaceName> {
        self.keyspace.as_ref()
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        debug!(
            "event=cql_execute module=memory kind={} keyspace={}",
            statement.kind(),
            self.keyspace.as_ref().map_or("<system>", KeyspaceName::as_str)
        );
        self.execute_now(statement)
    }
}

impl MemorySession {
    fn execute_now(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        match statement {
            Statement::CreateKeyspace {
                keyspace,
                replication,
                durable_writes,
                if_not_exists,
            } => {
                let mut keyspaces = self.state.write()?;
                if keyspaces.contains_key(keyspace.as_str()) {
                    return if *if_not_exists {
                        Ok(Vec::new())
                    } else {
                        Err(StoreError::KeyspaceExists(keyspace.to_string()))
                    };
                }
                keyspaces.insert(
                    keyspace.to_string(),
                    MemoryKeyspace {
                        replication: replication.clone(),
                        durable_writes: *durable_writes,
                        tables: BTreeMap::new(),
                    },
                );
                Ok(Vec::new())
            }
            Statement::ListTables { keyspace } => {
                let keyspaces = self.state.read()?;
                Ok(keyspaces
                    .get(keyspace.as_str())
                    .map(|keyspace| {
                        keyspace
                            .tables
                            .keys()
                            .map(|name| Row::new(vec![Some(CqlValue::Text(name.clone()))]))
                            .collect()
                    })
                    .unwrap_or_default())
            }
            Statement::CreateTable {
                table,
                if_not_exists,
            } => {
                validate_table_spec(table)?;
                self.with_keyspace_mut(|name, keyspace| {
                    if keyspace.tables.contains_key(&table.name) {
                        return if *if_not_exists {
                            Ok(Vec::new())
                        } else {
                            Err(StoreError::TableExists {
                                keyspace: name.to_string(),
                                table: table.name.clone(),
                            })
                        };
                    }
                    keyspace.tables.insert(
                        table.name.clone(),
                        MemoryTable {
                            spec: table.clone(),
                            rows: BTreeMap::new(),
                        },
                    );
                    Ok(Vec::new())
                })
            }
            Statement::DropTable { table, if_exists } => {
                self.with_keyspace_mut(|name, keyspace| {
                    if keyspace.tables.remove(table).is_none() && !if_exists {
                        return Err(StoreError::TableNotFound {
                            keyspace: name.to_string(),
                            table: table.clone(),
                        });
                    }
                    Ok(Vec::new())
                })
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => self.with_table_mut(table, |table| {
                table.upsert(columns, values)?;
                Ok(Vec::new())
            }),
            Statement::Select {
                table,
                columns,
                restrictions,
                limit,
            } => self.with_table(table, |table| {
                let indexes = columns
                    .iter()
                    .map(|column| table.column_index(column))
                    .collect::<StoreResult<Vec<_>>>()?;
                let limit = limit.map_or(usize::MAX, |limit| limit as usize);
                Ok(table
                    .matching(restrictions, KeyRule::Select)?
                    .take(limit)
                    .map(|(_, row)| {
                        Row::new(indexes.iter().map(|index| row[*index].clone()).collect())
                    })
                    .collect())
            }),
            Statement::Count {
                table,
                restrictions,
            } => self.with_table(table, |table| {
                let count = table.matching(restrictions, KeyRule::Select)?.count();
                Ok(vec![Row::new(vec![Some(CqlValue::BigInt(count as i64))])])
            }),
            Statement::Delete {
                table,
                restrictions,
            } => self.with_table_mut(table, |table| {
                let doomed = table
                    .matching(restrictions, KeyRule::Delete)?
                    .map(|(key, _)| key.clone())
                    .collect::<Vec<_>>();
                for key in doomed {
                    table.rows.remove(&key);
                }
                Ok(Vec::new())
            }),
            Statement::Truncate { table } => self.with_table_mut(table, |table| {
                table.rows.clear();
                Ok(Vec::new())
            }),
        }
    }

    fn bound_keyspace(&self) -> StoreResult<&KeyspaceName> {
        self.keyspace.as_ref().ok_or(StoreError::Unbound)
    }

    fn with_keyspace_mut<T>(
        &self,
        action: impl FnOnce(&KeyspaceName, &mut MemoryKeyspace) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let name = self.bound_keyspace()?;
        let mut keyspaces = self.state.write()?;
        let keyspace = keyspaces
            .get_mut(name.as_str())
            .ok_or_else(|| StoreError::KeyspaceNotFound(name.to_string()))?;
        action(name, keyspace)
    }

    fn with_table<T>(
        &self,
        table: &str,
        action: impl FnOnce(&MemoryTable) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let name = self.bound_keyspace()?;
        let keyspaces = self.state.read()?;
        let keyspace = keyspaces
            .get(name.as_str())
            .ok_or_else(|| StoreError::KeyspaceNotFound(name.to_string()))?;
        let table = keyspace
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound {
                keyspace: name.to_string(),
                table: table.to_string(),
            })?;
        action(table)
    }

    fn with_table_mut<T>(
        &self,
        table: &str,
        action: impl FnOnce(&mut MemoryTable) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.with_keyspace_mut(|name, keyspace| {
            let table = keyspace
                .tables
                .get_mut(table)
                .ok_or_else(|| StoreError::TableNotFound {
                    keyspace: name.to_string(),
                    table: table.to_string(),
                })?;
            action(table)
        })
    }
}

/// Which restriction shapes a statement accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRule {
    /// No restriction, or a full partition key plus a clustering prefix.
    Select,
    /// A full partition key plus a clustering prefix.
    Delete,
}

impl MemoryTable {
    fn column_index(&self, column: &str) -> StoreResult<usize> {
        self.spec
            .column(column)
            .map(|(index, _)| index)
            .ok_or_else(|| StoreError::InvalidQuery(format!("undefined column name {column}")))
    }

    fn upsert(&mut self, columns: &[String], values: &[CqlValue]) -> StoreResult<()> {
        if columns.len() != values.len() {
            return Err(StoreError::InvalidQuery(format!(
                "unmatched column names/values: {} columns, {} values",
                columns.len(),
                values.len()
            )));
        }

        let mut assigned: Vec<Option<CqlValue>> = vec![None; self.spec.columns.len()];
        for (column, value) in columns.iter().zip(values) {
            let index = self.column_index(column)?;
            let expected = self.spec.columns[index].cql_type;
            if value.cql_type() != expected {
                return Err(StoreError::InvalidQuery(format!(
                    "type error: column {column} is {expected}, got {}",
                    value.cql_type()
                )));
            }
            assigned[index] = Some(value.clone());
        }

        let mut key = Vec::new();
        for column in self.spec.primary_key() {
            let index = self.column_index(&column.name)?;
            match &assigned[index] {
                Some(value) => key.push(value.clone()),
                None => {
                    return Err(StoreError::InvalidQuery(format!(
                        "missing mandatory PRIMARY KEY part {}",
                        column.name
                    )))
                }
            }
        }

        let row = self
            .rows
            .entry(key)
            .or_insert_with(|| vec![None; assigned.len()]);
        for (cell, value) in row.iter_mut().zip(assigned) {
            if value.is_some() {
                *cell = value;
            }
        }
        Ok(())
    }

    fn matching<'t>(
        &'t self,
        restrictions: &[Restriction],
        rule: KeyRule,
    ) -> StoreResult<impl Iterator<Item = (&'t PrimaryKey, &'t Vec<Option<CqlValue>>)> + 't> {
        let prefix = self.key_prefix(restrictions, rule)?;
        Ok(self
            .rows
            .iter()
            .filter(move |(key, _)| key.starts_with(&prefix)))
    }

    /// Turns equality restrictions into a primary-key prefix, enforcing the
    /// CQL rule that only key columns may be restricted and only as a full
    /// partition key followed by a clustering prefix.
    fn key_prefix(&self, restrictions: &[Restriction], rule: KeyRule) -> StoreResult<PrimaryKey> {
        if restrictions.is_empty() && rule == KeyRule::Select {
            return Ok(Vec::new());
        }

        for restriction in restrictions {
            let (_, column) = self.spec.column(&restriction.column).ok_or_else(|| {
                StoreError::InvalidQuery(format!(
                    "undefined column name {}",
                    restriction.column
                ))
            })?;
            if column.kind == ColumnKind::Regular {
                return Err(StoreError::InvalidQuery(format!(
                    "cannot restrict non-primary-key column {} without ALLOW FILTERING",
                    column.name
                )));
            }
        }

        let mut prefix = Vec::new();
        let mut exhausted = false;
        for column in self.spec.primary_key() {
            let restricted = restrictions
                .iter()
                .find(|restriction| restriction.column == column.name);
            match (restricted, column.kind) {
                (Some(restriction), _) if !exhausted => prefix.push(restriction.value.clone()),
                (Some(_), _) => {
                    return Err(StoreError::InvalidQuery(format!(
                        "clustering column {} cannot be restricted, preceding column is not",
                        column.name
                    )))
                }
                (None, ColumnKind::PartitionKey) => {
                    return Err(StoreError::InvalidQuery(format!(
                        "partition key column {} must be restricted",
                        column.name
                    )))
                }
                (None, _) => exhausted = true,
            }
        }
        Ok(prefix)
    }
}

fn validate_table_spec(table: &TableSpec) -> StoreResult<()> {
    if table.partition_key().next().is_none() {
        return Err(StoreError::InvalidQuery(format!(
            "table {} has no partition key",
            table.name
        )));
    }
    Ok(())
}
