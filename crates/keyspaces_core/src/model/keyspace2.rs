//! Entities of the second keyspace.
//!
//! `B` reuses table name `a` and its column names under different field
//! names. It never shares a mapping context with `keyspace1::A`.

use crate::cql::{CqlType, CqlValue};
use crate::mapping::{
    ColumnDescriptor, Entity, EntityNamespace, MappingResult, RowReader, TableDescriptor,
};
use crate::repo::CassandraRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAMESPACE: &str = "keyspace2";

static B_TABLE: TableDescriptor = TableDescriptor {
    table: "a",
    columns: &[
        ColumnDescriptor::partition_key("x", "a", CqlType::Uuid),
        ColumnDescriptor::clustering_key("y", "b", CqlType::Text),
        ColumnDescriptor::regular("z", "c", CqlType::Text),
    ],
};

/// Row of table `a` in the second keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct B {
    /// Partition key, column `a`.
    pub x: Uuid,
    /// Clustering key, column `b`.
    pub y: String,
    /// Column `c`.
    pub z: String,
}

impl B {
    pub fn new(x: Uuid, y: impl Into<String>, z: impl Into<String>) -> Self {
        Self {
            x,
            y: y.into(),
            z: z.into(),
        }
    }

    pub fn id(&self) -> (Uuid, String) {
        (self.x, self.y.clone())
    }
}

impl Entity for B {
    type Id = (Uuid, String);
    type PartitionKey = Uuid;

    fn descriptor() -> &'static TableDescriptor {
        &B_TABLE
    }

    fn id_values((x, y): &Self::Id) -> Vec<CqlValue> {
        vec![CqlValue::Uuid(*x), CqlValue::Text(y.clone())]
    }

    fn partition_values(x: &Self::PartitionKey) -> Vec<CqlValue> {
        vec![CqlValue::Uuid(*x)]
    }

    fn write(&self) -> Vec<CqlValue> {
        vec![
            CqlValue::Uuid(self.x),
            CqlValue::Text(self.y.clone()),
            CqlValue::Text(self.z.clone()),
        ]
    }

    fn read(row: &RowReader<'_>) -> MappingResult<Self> {
        Ok(Self {
            x: row.uuid("x")?,
            y: row.text("y")?,
            z: row.text("z")?,
        })
    }
}

pub type BRepository = CassandraRepository<B>;

/// Entities owned by the second keyspace.
pub fn namespace() -> EntityNamespace {
    EntityNamespace::new(NAMESPACE).with::<B>()
}
