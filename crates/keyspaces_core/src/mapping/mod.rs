//! Entity mapping: descriptors, namespaces and per-keyspace mapping contexts.
//!
//! # Responsibility
//! - Describe how an entity type maps onto one CQL table.
//! - Collect entity types from explicit namespaces into a mapping context.
//! - Refuse to hand out mappings for entities a context does not manage.
//!
//! # Invariants
//! - Within one context, every managed entity maps to a distinct table.
//! - Every descriptor has at least one partition-key column and unique,
//!   valid column names.

use crate::cql::{ColumnKind, ColumnSpec, CqlType, CqlValue, Row, TableSpec};
use crate::keyspace::{validate_identifier, IdentifierError};
use log::info;
use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

pub mod converter;
pub mod schema;

pub use converter::EntityConverter;
pub use schema::{SchemaAction, SchemaError, SchemaManager};

pub type MappingResult<T> = Result<T, MappingError>;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("entity `{entity}` has no partition key column")]
    MissingPartitionKey { entity: &'static str },
    #[error("entity `{entity}` maps column `{column}` more than once")]
    DuplicateColumn {
        entity: &'static str,
        column: &'static str,
    },
    #[error("entities `{first}` and `{second}` both map to table `{table}`")]
    DuplicateTable {
        table: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[error("entity `{0}` is not managed by this mapping context")]
    EntityNotManaged(&'static str),
    #[error("entity `{entity}` has no field `{field}`")]
    UnknownField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("expected {expected} values for table `{table}`, got {actual}")]
    ArityMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("column `{table}.{column}` expects {expected}, got {actual}")]
    TypeMismatch {
        table: &'static str,
        column: &'static str,
        expected: CqlType,
        actual: CqlType,
    },
    #[error("column `{table}.{column}` is null")]
    NullValue {
        table: &'static str,
        column: &'static str,
    },
}

/// One entity field mapped onto one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub field: &'static str,
    pub column: &'static str,
    pub cql_type: CqlType,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    pub const fn partition_key(field: &'static str, column: &'static str, cql_type: CqlType) -> Self {
        Self {
            field,
            column,
            cql_type,
            kind: ColumnKind::PartitionKey,
        }
    }

    pub const fn clustering_key(
        field: &'static str,
        column: &'static str,
        cql_type: CqlType,
    ) -> Self {
        Self {
            field,
            column,
            cql_type,
            kind: ColumnKind::ClusteringKey,
        }
    }

    pub const fn regular(field: &'static str, column: &'static str, cql_type: CqlType) -> Self {
        Self {
            field,
            column,
            cql_type,
            kind: ColumnKind::Regular,
        }
    }
}

/// Static table mapping of an entity type. Column order is the order of
/// `Entity::write` output and of every selected row.
#[derive(Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table: &'static str,
    pub columns: &'static [ColumnDescriptor],
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.column.to_string())
            .collect()
    }

    /// Partition columns followed by clustering columns, with their
    /// positions in `columns`.
    pub fn primary_key(&self) -> Vec<(usize, &ColumnDescriptor)> {
        self.key_columns(ColumnKind::PartitionKey)
            .chain(self.key_columns(ColumnKind::ClusteringKey))
            .collect()
    }

    pub fn partition_key(&self) -> Vec<(usize, &ColumnDescriptor)> {
        self.key_columns(ColumnKind::PartitionKey).collect()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.field == field)
    }

    pub fn to_table_spec(&self) -> TableSpec {
        TableSpec {
            name: self.table.to_string(),
            columns: self
                .columns
                .iter()
                .map(|column| ColumnSpec {
                    name: column.column.to_string(),
                    cql_type: column.cql_type,
                    kind: column.kind,
                })
                .collect(),
        }
    }

    fn key_columns(&self, kind: ColumnKind) -> impl Iterator<Item = (usize, &ColumnDescriptor)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, column)| column.kind == kind)
    }

    fn validate(&self, entity: &'static str) -> MappingResult<()> {
        validate_identifier("table", self.table)?;
        let mut seen = HashSet::new();
        for column in self.columns {
            validate_identifier("column", column.column)?;
            if !seen.insert(column.column) {
                return Err(MappingError::DuplicateColumn {
                    entity,
                    column: column.column,
                });
            }
        }
        if self.partition_key().is_empty() {
            return Err(MappingError::MissingPartitionKey { entity });
        }
        Ok(())
    }
}

/// A record type stored in one table per keyspace.
///
/// `write` and `read` must agree with `descriptor().columns` ordering.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Full primary key: partition key then clustering key.
    type Id: Send + Sync;
    type PartitionKey: Send + Sync;

    fn descriptor() -> &'static TableDescriptor;

    fn id_values(id: &Self::Id) -> Vec<CqlValue>;

    fn partition_values(key: &Self::PartitionKey) -> Vec<CqlValue>;

    fn write(&self) -> Vec<CqlValue>;

    fn read(row: &RowReader<'_>) -> MappingResult<Self>;
}

/// Field-name access to one selected row.
pub struct RowReader<'a> {
    entity: &'static str,
    descriptor: &'static TableDescriptor,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(
        entity: &'static str,
        descriptor: &'static TableDescriptor,
        row: &'a Row,
    ) -> Self {
        Self {
            entity,
            descriptor,
            row,
        }
    }

    pub fn value(&self, field: &'static str) -> MappingResult<Option<&'a CqlValue>> {
        let index = self
            .descriptor
            .field_index(field)
            .ok_or(MappingError::UnknownField {
                entity: self.entity,
                field,
            })?;
        Ok(self.row.get(index))
    }

    pub fn uuid(&self, field: &'static str) -> MappingResult<Uuid> {
        match self.required(field)? {
            CqlValue::Uuid(value) => Ok(*value),
            other => Err(self.mismatch(field, other)),
        }
    }

    pub fn text(&self, field: &'static str) -> MappingResult<String> {
        match self.required(field)? {
            CqlValue::Text(value) => Ok(value.clone()),
            other => Err(self.mismatch(field, other)),
        }
    }

    fn required(&self, field: &'static str) -> MappingResult<&'a CqlValue> {
        self.value(field)?.ok_or_else(|| MappingError::NullValue {
            table: self.descriptor.table,
            column: self.column_of(field),
        })
    }

    fn column_of(&self, field: &'static str) -> &'static str {
        self.descriptor
            .columns
            .iter()
            .find(|column| column.field == field)
            .map_or(field, |column| column.column)
    }

    fn mismatch(&self, field: &'static str, actual: &CqlValue) -> MappingError {
        let column = self
            .descriptor
            .columns
            .iter()
            .find(|column| column.field == field);
        MappingError::TypeMismatch {
            table: self.descriptor.table,
            column: column.map_or(field, |column| column.column),
            expected: column.map_or(actual.cql_type(), |column| column.cql_type),
            actual: actual.cql_type(),
        }
    }
}

/// Registration of one entity type inside a namespace.
#[derive(Debug, Clone, Copy)]
pub struct EntityRegistration {
    type_id: TypeId,
    type_name: &'static str,
    descriptor: &'static TableDescriptor,
}

impl EntityRegistration {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            descriptor: E::descriptor(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn descriptor(&self) -> &'static TableDescriptor {
        self.descriptor
    }
}

/// Named group of entity types scanned together into a mapping context.
#[derive(Debug, Clone)]
pub struct EntityNamespace {
    name: &'static str,
    entities: Vec<EntityRegistration>,
}

impl EntityNamespace {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entities: Vec::new(),
        }
    }

    pub fn with<E: Entity>(mut self) -> Self {
        self.entities.push(EntityRegistration::of::<E>());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entities(&self) -> &[EntityRegistration] {
        &self.entities
    }
}

/// The set of entity types one keyspace stack may read and write.
#[derive(Debug)]
pub struct MappingContext {
    namespaces: Vec<&'static str>,
    entities: Vec<EntityRegistration>,
    by_type: HashMap<TypeId, usize>,
}

impl MappingContext {
    /// Builds a context from every entity in `namespaces`.
    ///
    /// An entity listed by several namespaces is managed once.
    ///
    /// # Errors
    /// - Any descriptor is invalid (identifiers, duplicate columns, no
    ///   partition key).
    /// - Two different entity types map to the same table.
    pub fn scan(namespaces: &[EntityNamespace]) -> MappingResult<Self> {
        let mut context = Self {
            namespaces: namespaces.iter().map(EntityNamespace::name).collect(),
            entities: Vec::new(),
            by_type: HashMap::new(),
        };
        let mut tables: HashMap<&'static str, &'static str> = HashMap::new();

        for registration in namespaces.iter().flat_map(|namespace| namespace.entities()) {
            if context.by_type.contains_key(&registration.type_id) {
                continue;
            }
            registration.descriptor.validate(registration.type_name)?;
            if let Some(first) = tables.insert(registration.descriptor.table, registration.type_name)
            {
                return Err(MappingError::DuplicateTable {
                    table: registration.descriptor.table,
                    first,
                    second: registration.type_name,
                });
            }
            context
                .by_type
                .insert(registration.type_id, context.entities.len());
            context.entities.push(*registration);
        }

        info!(
            "event=mapping_scan module=mapping status=ok namespaces={} entities={}",
            context.namespaces.join(","),
            context.entities.len()
        );
        Ok(context)
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<E>())
    }

    pub fn descriptor_of<E: Entity>(&self) -> MappingResult<&'static TableDescriptor> {
        self.by_type
            .get(&TypeId::of::<E>())
            .map(|index| self.entities[*index].descriptor)
            .ok_or(MappingError::EntityNotManaged(type_name::<E>()))
    }

    pub fn entities(&self) -> &[EntityRegistration] {
        &self.entities
    }

    pub fn namespaces(&self) -> &[&'static str] {
        &self.namespaces
    }

    pub fn tables(&self) -> impl Iterator<Item = &'static TableDescriptor> + '_ {
        self.entities
            .iter()
            .map(|registration| registration.descriptor)
    }
}
