//! Schema actions applied to mapped tables at bootstrap.
//!
//! # Responsibility
//! - Parse the configured schema action.
//! - Create, recreate or drop the tables of one mapping context inside the
//!   keyspace its session is bound to.
//!
//! # Invariants
//! - Only the bound keyspace is ever touched.
//! - `RecreateDropUnused` is the only action that drops tables the context
//!   does not map.

use super::MappingContext;
use crate::cql::{CqlSession, CqlValue, Statement, StoreError};
use log::{error, info};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown schema action `{0}`; expected NONE|CREATE|CREATE_IF_NOT_EXISTS|RECREATE|RECREATE_DROP_UNUSED")]
    UnknownAction(String),
    #[error("schema manager requires a keyspace-bound session")]
    Unbound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to do with mapped tables when a keyspace stack starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum SchemaAction {
    /// Leave the schema untouched.
    #[default]
    None,
    /// Create every mapped table; fails when one already exists.
    Create,
    /// Create mapped tables that do not exist yet.
    CreateIfNotExists,
    /// Drop and re-create every mapped table.
    Recreate,
    /// Drop every table in the keyspace, then create the mapped ones.
    RecreateDropUnused,
}

impl SchemaAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Create => "CREATE",
            Self::CreateIfNotExists => "CREATE_IF_NOT_EXISTS",
            Self::Recreate => "RECREATE",
            Self::RecreateDropUnused => "RECREATE_DROP_UNUSED",
        }
    }
}

impl Display for SchemaAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaAction {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NONE" => Ok(Self::None),
            "CREATE" => Ok(Self::Create),
            "CREATE_IF_NOT_EXISTS" => Ok(Self::CreateIfNotExists),
            "RECREATE" => Ok(Self::Recreate),
            "RECREATE_DROP_UNUSED" => Ok(Self::RecreateDropUnused),
            _ => Err(SchemaError::UnknownAction(value.to_string())),
        }
    }
}

impl TryFrom<String> for SchemaAction {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Applies schema actions for one mapping context over one session.
pub struct SchemaManager<'a> {
    session: &'a dyn CqlSession,
    context: &'a MappingContext,
}

impl<'a> SchemaManager<'a> {
    pub fn new(session: &'a dyn CqlSession, context: &'a MappingContext) -> Self {
        Self { session, context }
    }

    /// Applies `action` to the bound keyspace.
    ///
    /// # Side effects
    /// - Emits `schema_apply` logging events with duration and status.
    pub async fn apply(&self, action: SchemaAction) -> SchemaResult<()> {
        let started_at = Instant::now();
        let keyspace = self
            .session
            .keyspace()
            .ok_or(SchemaError::Unbound)?
            .to_string();
        info!("event=schema_apply module=schema status=start keyspace={keyspace} action={action}");

        let result = match action {
            SchemaAction::None => Ok(()),
            SchemaAction::Create => self.create_tables(false).await,
            SchemaAction::CreateIfNotExists => self.create_tables(true).await,
            SchemaAction::Recreate => match self.drop_tables(false).await {
                Ok(()) => self.create_tables(false).await,
                Err(err) => Err(err),
            },
            SchemaAction::RecreateDropUnused => match self.drop_tables(true).await {
                Ok(()) => self.create_tables(false).await,
                Err(err) => Err(err),
            },
        };

        match &result {
            Ok(()) => info!(
                "event=schema_apply module=schema status=ok keyspace={keyspace} action={action} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=schema_apply module=schema status=error keyspace={keyspace} action={action} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Issues `CREATE TABLE` for every mapped entity.
    pub async fn create_tables(&self, if_not_exists: bool) -> SchemaResult<()> {
        for descriptor in self.context.tables() {
            self.session
                .execute(&Statement::CreateTable {
                    table: descriptor.to_table_spec(),
                    if_not_exists,
                })
                .await?;
        }
        Ok(())
    }

    /// Drops mapped tables, or every table in the keyspace when
    /// `include_unused` is set.
    pub async fn drop_tables(&self, include_unused: bool) -> SchemaResult<()> {
        let tables = if include_unused {
            self.existing_tables().await?
        } else {
            self.context
                .tables()
                .map(|descriptor| descriptor.table.to_string())
                .collect()
        };
        for table in tables {
            self.session
                .execute(&Statement::DropTable {
                    table,
                    if_exists: true,
                })
                .await?;
        }
        Ok(())
    }

    /// Names of all tables currently in the bound keyspace.
    pub async fn existing_tables(&self) -> SchemaResult<Vec<String>> {
        let keyspace = self.session.keyspace().ok_or(SchemaError::Unbound)?.clone();
        let rows = self
            .session
            .execute(&Statement::ListTables { keyspace })
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| match row.get(0) {
                Some(CqlValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{SchemaAction, SchemaError};

    #[test]
    fn parse_accepts_canonical_and_relaxed_spellings() {
        assert_eq!(
            "CREATE_IF_NOT_EXISTS".parse::<SchemaAction>().unwrap(),
            SchemaAction::CreateIfNotExists
        );
        assert_eq!(
            " recreate-drop-unused ".parse::<SchemaAction>().unwrap(),
            SchemaAction::RecreateDropUnused
        );
        assert_eq!("none".parse::<SchemaAction>().unwrap(), SchemaAction::None);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = "CREATE_ALWAYS".parse::<SchemaAction>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownAction(value) if value == "CREATE_ALWAYS"));
    }

    #[test]
    fn display_uses_configuration_spelling() {
        assert_eq!(SchemaAction::Recreate.to_string(), "RECREATE");
        assert_eq!(SchemaAction::default(), SchemaAction::None);
    }
}
