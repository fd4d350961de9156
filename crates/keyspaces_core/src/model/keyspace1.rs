//! Entities of the first keyspace.

use crate::cql::{CqlType, CqlValue};
use crate::mapping::{
    ColumnDescriptor, Entity, EntityNamespace, MappingResult, RowReader, TableDescriptor,
};
use crate::repo::CassandraRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAMESPACE: &str = "keyspace1";

static A_TABLE: TableDescriptor = TableDescriptor {
    table: "a",
    columns: &[
        ColumnDescriptor::partition_key("a", "a", CqlType::Uuid),
        ColumnDescriptor::clustering_key("b", "b", CqlType::Text),
        ColumnDescriptor::regular("c", "c", CqlType::Text),
    ],
};

/// Row of table `a` in the first keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct A {
    /// Partition key.
    pub a: Uuid,
    /// Clustering key.
    pub b: String,
    pub c: String,
}

impl A {
    pub fn new(a: Uuid, b: impl Into<String>, c: impl Into<String>) -> Self {
        Self {
            a,
            b: b.into(),
            c: c.into(),
        }
    }

    pub fn id(&self) -> (Uuid, String) {
        (self.a, self.b.clone())
    }
}

impl Entity for A {
    type Id = (Uuid, String);
    type PartitionKey = Uuid;

    fn descriptor() -> &'static TableDescriptor {
        &A_TABLE
    }

    fn id_values((a, b): &Self::Id) -> Vec<CqlValue> {
        vec![CqlValue::Uuid(*a), CqlValue::Text(b.clone())]
    }

    fn partition_values(a: &Self::PartitionKey) -> Vec<CqlValue> {
        vec![CqlValue::Uuid(*a)]
    }

    fn write(&self) -> Vec<CqlValue> {
        vec![
            CqlValue::Uuid(self.a),
            CqlValue::Text(self.b.clone()),
            CqlValue::Text(self.c.clone()),
        ]
    }

    fn read(row: &RowReader<'_>) -> MappingResult<Self> {
        Ok(Self {
            a: row.uuid("a")?,
            b: row.text("b")?,
            c: row.text("c")?,
        })
    }
}

pub type ARepository = CassandraRepository<A>;

/// Entities owned by the first keyspace.
pub fn namespace() -> EntityNamespace {
    EntityNamespace::new(NAMESPACE).with::<A>()
}
