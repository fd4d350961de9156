//! Row/entity conversion bound to one mapping context.
//!
//! # Invariants
//! - Only entities managed by the context can be written or read.
//! - Written values always match the descriptor's arity and column types.

use super::{Entity, MappingContext, MappingError, MappingResult, RowReader, TableDescriptor};
use crate::cql::{CqlValue, Restriction, Row};
use std::any::type_name;
use std::sync::Arc;

/// Translates between entities and CQL rows for one keyspace.
#[derive(Debug, Clone)]
pub struct EntityConverter {
    context: Arc<MappingContext>,
}

impl EntityConverter {
    pub fn new(context: Arc<MappingContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &MappingContext {
        &self.context
    }

    pub fn descriptor<E: Entity>(&self) -> MappingResult<&'static TableDescriptor> {
        self.context.descriptor_of::<E>()
    }

    /// Values for every column, in descriptor order.
    pub fn write<E: Entity>(&self, entity: &E) -> MappingResult<Vec<CqlValue>> {
        let descriptor = self.descriptor::<E>()?;
        let values = entity.write();
        check_values(
            descriptor,
            descriptor.columns.iter().map(|column| column.column),
            descriptor.columns.iter().map(|column| column.cql_type),
            &values,
        )?;
        Ok(values)
    }

    pub fn read<E: Entity>(&self, row: &Row) -> MappingResult<E> {
        let descriptor = self.descriptor::<E>()?;
        if row.len() != descriptor.columns.len() {
            return Err(MappingError::ArityMismatch {
                table: descriptor.table,
                expected: descriptor.columns.len(),
                actual: row.len(),
            });
        }
        E::read(&RowReader::new(type_name::<E>(), descriptor, row))
    }

    /// Equality restrictions selecting exactly the row with `id`.
    pub fn id_restrictions<E: Entity>(&self, id: &E::Id) -> MappingResult<Vec<Restriction>> {
        let descriptor = self.descriptor::<E>()?;
        let key = descriptor.primary_key();
        restrictions(descriptor, &key, E::id_values(id))
    }

    /// Equality restrictions selecting every row of one partition.
    pub fn partition_restrictions<E: Entity>(
        &self,
        partition: &E::PartitionKey,
    ) -> MappingResult<Vec<Restriction>> {
        let descriptor = self.descriptor::<E>()?;
        let key = descriptor.partition_key();
        restrictions(descriptor, &key, E::partition_values(partition))
    }

    /// Equality restrictions selecting the row `entity` would be stored in.
    pub fn key_restrictions<E: Entity>(&self, entity: &E) -> MappingResult<Vec<Restriction>> {
        let descriptor = self.descriptor::<E>()?;
        let values = self.write(entity)?;
        Ok(descriptor
            .primary_key()
            .into_iter()
            .map(|(index, column)| Restriction::eq(column.column, values[index].clone()))
            .collect())
    }
}

fn restrictions(
    descriptor: &'static TableDescriptor,
    key: &[(usize, &super::ColumnDescriptor)],
    values: Vec<CqlValue>,
) -> MappingResult<Vec<Restriction>> {
    check_values(
        descriptor,
        key.iter().map(|(_, column)| column.column),
        key.iter().map(|(_, column)| column.cql_type),
        &values,
    )?;
    Ok(key
        .iter()
        .zip(values)
        .map(|((_, column), value)| Restriction::eq(column.column, value))
        .collect())
}

fn check_values(
    descriptor: &'static TableDescriptor,
    columns: impl ExactSizeIterator<Item = &'static str>,
    types: impl Iterator<Item = crate::cql::CqlType>,
    values: &[CqlValue],
) -> MappingResult<()> {
    if columns.len() != values.len() {
        return Err(MappingError::ArityMismatch {
            table: descriptor.table,
            expected: columns.len(),
            actual: values.len(),
        });
    }
    for ((column, expected), value) in columns.zip(types).zip(values) {
        if value.cql_type() != expected {
            return Err(MappingError::TypeMismatch {
                table: descriptor.table,
                column,
                expected,
                actual: value.cql_type(),
            });
        }
    }
    Ok(())
}
