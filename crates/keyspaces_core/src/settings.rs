//! Application settings: shared cluster connection plus per-keyspace names.
//!
//! # Responsibility
//! - Load settings from an optional TOML file layered under `KEYSPACES__*`
//!   environment variables.
//! - Validate settings before any connection is attempted.
//!
//! # Invariants
//! - Username and password are configured together or not at all.
//! - The password is only exposed when building connection options.

use crate::cql::{ConnectOptions, Credentials};
use crate::keyspace::{IdentifierError, KeyspaceName, Replication};
use crate::logging::default_log_level;
use crate::mapping::SchemaAction;
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Port used for contact points given without one.
pub const DEFAULT_CQL_PORT: u16 = 9042;
const ENV_PREFIX: &str = "KEYSPACES";
const ENV_SEPARATOR: &str = "__";
const DATACENTERS_KEY: &str = "replication-datacenters";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("cassandra.contact-points must list at least one host")]
    EmptyContactPoints,
    #[error("invalid contact point `{0}`; expected host or host:port")]
    InvalidContactPoint(String),
    #[error("cassandra.local-datacenter must not be empty")]
    MissingDatacenter,
    #[error("cassandra.username and cassandra.password must be set together")]
    IncompleteCredentials,
    #[error("invalid replication datacenter name `{0}`")]
    InvalidDatacenter(String),
    #[error("replication factors must be at least 1")]
    ZeroReplicationFactor,
    #[error(transparent)]
    InvalidKeyspace(#[from] IdentifierError),
    #[error("keyspace `{0}` is configured more than once")]
    DuplicateKeyspace(String),
}

/// Connection settings shared by every keyspace session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSettings {
    pub contact_points: String,
    pub local_datacenter: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub schema_action: SchemaAction,
    /// Create missing keyspaces at bootstrap. Meant for dev and test only.
    #[serde(default = "default_create_keyspaces")]
    pub create_keyspaces: bool,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    /// Per-datacenter factors; when present, keyspaces are created with
    /// `NetworkTopologyStrategy` and `replication_factor` is ignored.
    #[serde(default)]
    pub replication_datacenters: BTreeMap<String, u32>,
}

fn default_create_keyspaces() -> bool {
    true
}

fn default_replication_factor() -> u32 {
    1
}

impl ClusterSettings {
    /// Splits `contact_points` into `host:port` entries.
    pub fn contact_points(&self) -> Result<Vec<String>, SettingsError> {
        let points = self
            .contact_points
            .split(',')
            .map(str::trim)
            .filter(|point| !point.is_empty())
            .map(normalize_contact_point)
            .collect::<Result<Vec<_>, _>>()?;
        if points.is_empty() {
            return Err(SettingsError::EmptyContactPoints);
        }
        Ok(points)
    }

    pub fn credentials(&self) -> Result<Option<Credentials>, SettingsError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            })),
            (None, None) => Ok(None),
            _ => Err(SettingsError::IncompleteCredentials),
        }
    }

    pub fn replication(&self) -> Replication {
        if self.replication_datacenters.is_empty() {
            Replication::Simple {
                replication_factor: self.replication_factor,
            }
        } else {
            Replication::NetworkTopology {
                datacenters: self.replication_datacenters.clone(),
            }
        }
    }

    /// Options for an unbound session; bind with [`ConnectOptions::bound_to`].
    pub fn connect_options(&self) -> Result<ConnectOptions, SettingsError> {
        self.validate()?;
        Ok(ConnectOptions {
            contact_points: self.contact_points()?,
            local_datacenter: self.local_datacenter.trim().to_string(),
            credentials: self.credentials()?,
            keyspace: None,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.contact_points()?;
        self.credentials()?;
        if self.local_datacenter.trim().is_empty() {
            return Err(SettingsError::MissingDatacenter);
        }
        if self.replication_factor == 0 || self.replication_datacenters.values().any(|f| *f == 0) {
            return Err(SettingsError::ZeroReplicationFactor);
        }
        if let Some(datacenter) = self
            .replication_datacenters
            .keys()
            .find(|name| name.is_empty() || name.contains('\''))
        {
            return Err(SettingsError::InvalidDatacenter(datacenter.clone()));
        }
        Ok(())
    }
}

fn normalize_contact_point(point: &str) -> Result<String, SettingsError> {
    let invalid = || SettingsError::InvalidContactPoint(point.to_string());
    match point.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(invalid());
            }
            Ok(point.to_string())
        }
        None if point.chars().any(char::is_whitespace) => Err(invalid()),
        None => Ok(format!("{point}:{DEFAULT_CQL_PORT}")),
    }
}

/// Settings of one logical keyspace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeyspaceSettings {
    pub keyspace_name: String,
}

impl KeyspaceSettings {
    pub fn keyspace(&self) -> Result<KeyspaceName, SettingsError> {
        Ok(KeyspaceName::parse(&self.keyspace_name)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files; stderr when absent.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

/// Root settings document.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cassandra: ClusterSettings,
    /// First keyspace (`a.keyspace-name`).
    pub a: KeyspaceSettings,
    /// Second keyspace (`b.keyspace-name`).
    pub b: KeyspaceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Loads `path` (when given) and then `KEYSPACES__*` environment
    /// overrides, e.g. `KEYSPACES__CASSANDRA__CONTACT_POINTS`.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with_env(path, std::env::vars())
    }

    /// Same as [`Settings::load`] with an explicit set of environment
    /// variables.
    pub fn load_with_env(
        path: Option<&Path>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings: Self = with_environment(builder, vars)?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.cassandra.validate()?;
        let first = self.a.keyspace()?;
        let second = self.b.keyspace()?;
        if first == second {
            return Err(SettingsError::DuplicateKeyspace(first.to_string()));
        }
        Ok(())
    }
}

/// Maps `KEYSPACES__A__KEYSPACE_NAME` to the kebab-case file path
/// `a.keyspace-name`. Segments below `replication-datacenters` are
/// datacenter names and are kept verbatim.
fn override_path(key: &str) -> Option<String> {
    let mut segments = key
        .strip_prefix(ENV_PREFIX)?
        .strip_prefix(ENV_SEPARATOR)?
        .split(ENV_SEPARATOR);
    let mut path = Vec::new();
    for segment in segments.by_ref() {
        let field = segment.to_ascii_lowercase().replace('_', "-");
        let opens_map = field == DATACENTERS_KEY;
        path.push(field);
        if opens_map {
            break;
        }
    }
    path.extend(segments.map(str::to_string));
    Some(path.join("."))
}

/// Layers environment overrides on top of the file sources. Values stay
/// strings; serde converts them where a field wants a bool or a number.
fn with_environment(
    mut builder: ConfigBuilder<DefaultState>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    for (key, value) in vars {
        if let Some(path) = override_path(&key) {
            builder = builder.set_override(path, value)?;
        }
    }
    Ok(builder)
}
