//! Structured CQL statements.
//!
//! # Responsibility
//! - Describe every statement the persistence layer issues.
//! - Render CQL text with `?` placeholders plus the bound values in order.
//!
//! # Invariants
//! - Table and column names are unqualified; they resolve against the
//!   keyspace the executing session is bound to.
//! - `values()` yields exactly one value per `?` in `cql()`.

use super::value::{CqlType, CqlValue};
use crate::keyspace::{KeyspaceName, Replication};

/// Role of a column in the table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    PartitionKey,
    ClusteringKey,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub cql_type: CqlType,
    pub kind: ColumnKind,
}

/// Table layout as sent in `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn partition_key(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns_of(ColumnKind::PartitionKey)
    }

    pub fn clustering_key(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns_of(ColumnKind::ClusteringKey)
    }

    /// Partition columns followed by clustering columns.
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.partition_key().chain(self.clustering_key())
    }

    pub fn column(&self, name: &str) -> Option<(usize, &ColumnSpec)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.name == name)
    }

    fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(move |column| column.kind == kind)
    }
}

/// Equality restriction in a `WHERE` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub column: String,
    pub value: CqlValue,
}

impl Restriction {
    pub fn eq(column: impl Into<String>, value: impl Into<CqlValue>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateKeyspace {
        keyspace: KeyspaceName,
        replication: Replication,
        durable_writes: bool,
        if_not_exists: bool,
    },
    CreateTable {
        table: TableSpec,
        if_not_exists: bool,
    },
    DropTable {
        table: String,
        if_exists: bool,
    },
    /// Names of all tables in `keyspace`, one text column per row.
    ListTables {
        keyspace: KeyspaceName,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<CqlValue>,
    },
    Select {
        table: String,
        columns: Vec<String>,
        restrictions: Vec<Restriction>,
        limit: Option<u32>,
    },
    /// One row with a single bigint column.
    Count {
        table: String,
        restrictions: Vec<Restriction>,
    },
    Delete {
        table: String,
        restrictions: Vec<Restriction>,
    },
    Truncate {
        table: String,
    },
}

impl Statement {
    /// Short statement kind used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateKeyspace { .. } => "create_keyspace",
            Self::CreateTable { .. } => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::ListTables { .. } => "list_tables",
            Self::Insert { .. } => "insert",
            Self::Select { .. } => "select",
            Self::Count { .. } => "count",
            Self::Delete { .. } => "delete",
            Self::Truncate { .. } => "truncate",
        }
    }

    pub fn cql(&self) -> String {
        match self {
            Self::CreateKeyspace {
                keyspace,
                replication,
                durable_writes,
                if_not_exists,
            } => format!(
                "CREATE KEYSPACE {}{keyspace} WITH replication = {replication} AND durable_writes = {durable_writes}",
                if_not_exists_clause(*if_not_exists)
            ),
            Self::CreateTable {
                table,
                if_not_exists,
            } => {
                let columns = table
                    .columns
                    .iter()
                    .map(|column| format!("{} {}", column.name, column.cql_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                let partition = table
                    .partition_key()
                    .map(|column| column.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut primary_key = format!("({partition})");
                for column in table.clustering_key() {
                    primary_key.push_str(", ");
                    primary_key.push_str(&column.name);
                }
                format!(
                    "CREATE TABLE {}{} ({columns}, PRIMARY KEY ({primary_key}))",
                    if_not_exists_clause(*if_not_exists),
                    table.name
                )
            }
            Self::DropTable { table, if_exists } => {
                let clause = if *if_exists { "IF EXISTS " } else { "" };
                format!("DROP TABLE {clause}{table}")
            }
            Self::ListTables { .. } => {
                "SELECT table_name FROM system_schema.tables WHERE keyspace_name = ?".to_string()
            }
            Self::Insert {
                table, columns, ..
            } => {
                let placeholders = vec!["?"; columns.len()].join(", ");
                format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})",
                    columns.join(", ")
                )
            }
            Self::Select {
                table,
                columns,
                restrictions,
                limit,
            } => {
                let mut cql = format!(
                    "SELECT {} FROM {table}{}",
                    columns.join(", "),
                    where_clause(restrictions)
                );
                if let Some(limit) = limit {
                    cql.push_str(&format!(" LIMIT {limit}"));
                }
                cql
            }
            Self::Count {
                table,
                restrictions,
            } => format!("SELECT count(*) FROM {table}{}", where_clause(restrictions)),
            Self::Delete {
                table,
                restrictions,
            } => format!("DELETE FROM {table}{}", where_clause(restrictions)),
            Self::Truncate { table } => format!("TRUNCATE {table}"),
        }
    }

    pub fn values(&self) -> Vec<CqlValue> {
        match self {
            Self::ListTables { keyspace } => vec![CqlValue::Text(keyspace.to_string())],
            Self::Insert { values, .. } => values.clone(),
            Self::Select { restrictions, .. }
            | Self::Count { restrictions, .. }
            | Self::Delete { restrictions, .. } => restrictions
                .iter()
                .map(|restriction| restriction.value.clone())
                .collect(),
            Self::CreateKeyspace { .. }
            | Self::CreateTable { .. }
            | Self::DropTable { .. }
            | Self::Truncate { .. } => Vec::new(),
        }
    }
}

fn if_not_exists_clause(if_not_exists: bool) -> &'static str {
    if if_not_exists {
        "IF NOT EXISTS "
    } else {
        ""
    }
}

fn where_clause(restrictions: &[Restriction]) -> String {
    if restrictions.is_empty() {
        return String::new();
    }
    let conditions = restrictions
        .iter()
        .map(|restriction| format!("{} = ?", restriction.column))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(" WHERE {conditions}")
}

#[cfg(test)]
mod tests {
    use super::{ColumnKind, ColumnSpec, Restriction, Statement, TableSpec};
    use crate::cql::value::{CqlType, CqlValue};
    use crate::keyspace::{KeyspaceName, Replication};
    use uuid::Uuid;

    fn sample_table() -> TableSpec {
        TableSpec {
            name: "a".to_string(),
            columns: vec![
                ColumnSpec {
                    name: "a".to_string(),
                    cql_type: CqlType::Uuid,
                    kind: ColumnKind::PartitionKey,
                },
                ColumnSpec {
                    name: "b".to_string(),
                    cql_type: CqlType::Text,
                    kind: ColumnKind::ClusteringKey,
                },
                ColumnSpec {
                    name: "c".to_string(),
                    cql_type: CqlType::Text,
                    kind: ColumnKind::Regular,
                },
            ],
        }
    }

    #[test]
    fn create_keyspace_renders_replication_and_durable_writes() {
        let statement = Statement::CreateKeyspace {
            keyspace: KeyspaceName::parse("a_keyspace").unwrap(),
            replication: Replication::default(),
            durable_writes: true,
            if_not_exists: true,
        };

        assert_eq!(
            statement.cql(),
            "CREATE KEYSPACE IF NOT EXISTS a_keyspace WITH replication = \
             {'class': 'SimpleStrategy', 'replication_factor': 1} AND durable_writes = true"
        );
        assert!(statement.values().is_empty());
    }

    #[test]
    fn create_table_renders_composite_primary_key() {
        let statement = Statement::CreateTable {
            table: sample_table(),
            if_not_exists: false,
        };

        assert_eq!(
            statement.cql(),
            "CREATE TABLE a (a uuid, b text, c text, PRIMARY KEY ((a), b))"
        );
    }

    #[test]
    fn select_binds_restrictions_in_order() {
        let id = Uuid::new_v4();
        let statement = Statement::Select {
            table: "a".to_string(),
            columns: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            restrictions: vec![Restriction::eq("a", id), Restriction::eq("b", "test")],
            limit: Some(2),
        };

        assert_eq!(
            statement.cql(),
            "SELECT a, b, c FROM a WHERE a = ? AND b = ? LIMIT 2"
        );
        assert_eq!(
            statement.values(),
            vec![CqlValue::Uuid(id), CqlValue::Text("test".to_string())]
        );
    }

    #[test]
    fn insert_count_delete_and_truncate_render() {
        let insert = Statement::Insert {
            table: "c".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![CqlValue::Int(1), CqlValue::Boolean(true)],
        };
        assert_eq!(insert.cql(), "INSERT INTO c (a, b) VALUES (?, ?)");
        assert_eq!(insert.values().len(), 2);

        let count = Statement::Count {
            table: "c".to_string(),
            restrictions: Vec::new(),
        };
        assert_eq!(count.cql(), "SELECT count(*) FROM c");

        let delete = Statement::Delete {
            table: "c".to_string(),
            restrictions: vec![Restriction::eq("a", 7_i64)],
        };
        assert_eq!(delete.cql(), "DELETE FROM c WHERE a = ?");

        let truncate = Statement::Truncate {
            table: "c".to_string(),
        };
        assert_eq!(truncate.cql(), "TRUNCATE c");
        assert_eq!(truncate.kind(), "truncate");
    }

    #[test]
    fn list_tables_binds_keyspace_name() {
        let statement = Statement::ListTables {
            keyspace: KeyspaceName::parse("b_keyspace").unwrap(),
        };
        assert_eq!(
            statement.values(),
            vec![CqlValue::Text("b_keyspace".to_string())]
        );
    }
}
