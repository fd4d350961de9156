//! Entities mapped into every keyspace.

use crate::cql::{CqlType, CqlValue};
use crate::mapping::{
    ColumnDescriptor, Entity, EntityNamespace, MappingResult, RowReader, TableDescriptor,
};
use crate::repo::CassandraRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NAMESPACE: &str = "global";

static C_TABLE: TableDescriptor = TableDescriptor {
    table: "c",
    columns: &[
        ColumnDescriptor::partition_key("a", "a", CqlType::Uuid),
        ColumnDescriptor::clustering_key("b", "b", CqlType::Text),
        ColumnDescriptor::regular("c", "c", CqlType::Text),
    ],
};

/// Row of table `c`; each keyspace holds its own copy of the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct C {
    pub a: Uuid,
    pub b: String,
    pub c: String,
}

impl C {
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

impl Entity for C {
    type Id = (Uuid, String);
    type PartitionKey = Uuid;

    fn descriptor() -> &'static TableDescriptor {
        &C_TABLE
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

/// `C` repository bound to the first keyspace.
///
/// Both `C` aliases name the same type, `CassandraRepository<C>`. The
/// compiler does not tell them apart: the keyspace comes from the
/// [`KeyspaceStack`](crate::stack::KeyspaceStack) that built the value, and
/// [`CassandraRepository::keyspace`] reports it at runtime.
pub type Keyspace1CRepository = CassandraRepository<C>;
/// `C` repository bound to the second keyspace. Same type as
/// [`Keyspace1CRepository`].
pub type Keyspace2CRepository = CassandraRepository<C>;

/// Entities shared by every keyspace.
pub fn namespace() -> EntityNamespace {
    EntityNamespace::new(NAMESPACE).with::<C>()
}

#[cfg(test)]
mod tests {
    use super::C;
    use uuid::Uuid;

    #[test]
    fn serializes_with_column_names() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(C::new(id, "key", "value")).unwrap();
        assert_eq!(json["a"], id.to_string());
        assert_eq!(json["b"], "key");
        assert_eq!(json["c"], "value");
    }
}
