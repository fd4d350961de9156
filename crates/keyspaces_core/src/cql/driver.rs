//! Cluster backend on the `scylla` CQL driver.
//!
//! Works against Cassandra and ScyllaDB alike. Pooling, retries and
//! topology tracking stay inside the driver.

use super::{
    Cluster, ConnectOptions, CqlSession, CqlValue, Row, Statement, StoreError, StoreResult,
};
use crate::keyspace::KeyspaceName;
use ::scylla::frame::response::result::{CqlValue as WireValue, Row as WireRow};
use ::scylla::load_balancing::DefaultPolicy;
use ::scylla::{ExecutionProfile, Session, SessionBuilder};
use async_trait::async_trait;
use log::{debug, info};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;

/// Connects to a real cluster through the `scylla` driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScyllaCluster;

#[async_trait]
impl Cluster for ScyllaCluster {
    async fn connect(&self, options: &ConnectOptions) -> StoreResult<Arc<dyn CqlSession>> {
        if options.contact_points.is_empty() {
            return Err(StoreError::NoContactPoints);
        }

        let started_at = Instant::now();
        let policy = DefaultPolicy::builder()
            .prefer_datacenter(options.local_datacenter.clone())
            .token_aware(true)
            .build();
        let profile = ExecutionProfile::builder()
            .load_balancing_policy(policy)
            .build();

        let mut builder = SessionBuilder::new()
            .known_nodes(&options.contact_points)
            .default_execution_profile_handle(profile.into_handle());
        if let Some(credentials) = &options.credentials {
            builder = builder.user(
                credentials.username.clone(),
                credentials.password.expose_secret().clone(),
            );
        }
        if let Some(keyspace) = &options.keyspace {
            builder = builder.use_keyspace(keyspace.as_str(), false);
        }

        let session = builder.build().await?;
        info!(
            "event=driver_connect module=cql status=ok keyspace={} datacenter={} duration_ms={}",
            keyspace_label(options.keyspace.as_ref()),
            options.local_datacenter,
            started_at.elapsed().as_millis()
        );

        Ok(Arc::new(ScyllaSession {
            session,
            keyspace: options.keyspace.clone(),
        }))
    }
}

/// Driver session bound to at most one keyspace.
pub struct ScyllaSession {
    session: Session,
    keyspace: Option<KeyspaceName>,
}

#[async_trait]
impl CqlSession for ScyllaSession {
    fn keyspace(&self) -> Option<&KeyspaceName> {
        self.keyspace.as_ref()
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<Vec<Row>> {
        let cql = statement.cql();
        debug!(
            "event=cql_execute module=cql kind={} keyspace={} cql={}",
            statement.kind(),
            keyspace_label(self.keyspace.as_ref()),
            cql
        );

        let values: Vec<WireValue> = statement.values().into_iter().map(to_wire).collect();
        let result = self.session.query(cql, values).await?;

        result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(from_wire_row)
            .collect()
    }
}

fn keyspace_label(keyspace: Option<&KeyspaceName>) -> &str {
    keyspace.map_or("<system>", KeyspaceName::as_str)
}

fn to_wire(value: CqlValue) -> WireValue {
    match value {
        CqlValue::Uuid(value) => WireValue::Uuid(value),
        CqlValue::Text(value) => WireValue::Text(value),
        CqlValue::BigInt(value) => WireValue::BigInt(value),
        CqlValue::Int(value) => WireValue::Int(value),
        CqlValue::Boolean(value) => WireValue::Boolean(value),
    }
}

fn from_wire_row(row: WireRow) -> StoreResult<Row> {
    let values = row
        .columns
        .into_iter()
        .enumerate()
        .map(|(index, column)| column.map(|value| from_wire(index, value)).transpose())
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Row::new(values))
}

fn from_wire(index: usize, value: WireValue) -> StoreResult<CqlValue> {
    match value {
        WireValue::Uuid(value) => Ok(CqlValue::Uuid(value)),
        WireValue::Text(value) | WireValue::Ascii(value) => Ok(CqlValue::Text(value)),
        WireValue::BigInt(value) => Ok(CqlValue::BigInt(value)),
        WireValue::Int(value) => Ok(CqlValue::Int(value)),
        WireValue::Boolean(value) => Ok(CqlValue::Boolean(value)),
        other => Err(StoreError::UnsupportedValue {
            index,
            detail: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{from_wire, to_wire};
    use crate::cql::{CqlValue, StoreError};
    use ::scylla::frame::response::result::CqlValue as WireValue;
    use uuid::Uuid;

    #[test]
    fn values_map_both_ways() {
        let id = Uuid::new_v4();
        for value in [
            CqlValue::Uuid(id),
            CqlValue::Text("test".to_string()),
            CqlValue::BigInt(42),
            CqlValue::Int(7),
            CqlValue::Boolean(true),
        ] {
            assert_eq!(from_wire(0, to_wire(value.clone())).unwrap(), value);
        }
    }

    #[test]
    fn ascii_reads_as_text_and_unknown_types_fail() {
        assert_eq!(
            from_wire(0, WireValue::Ascii("plain".to_string())).unwrap(),
            CqlValue::Text("plain".to_string())
        );

        let err = from_wire(3, WireValue::Float(1.5)).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedValue { index: 3, .. }));
    }
}
