use keyspaces_core::{Replication, SchemaAction, Settings, SettingsError};
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

const FILE: &str = r#"
[cassandra]
contact-points = "cassandra-1:9042,cassandra-2:9042"
local-datacenter = "datacenter1"
schema-action = "NONE"

[a]
keyspace-name = "a_keyspace"

[b]
keyspace-name = "b_keyspace"

[logging]
level = "warn"
"#;

fn settings_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn loads_file_without_overrides() {
    let file = settings_file(FILE);
    let settings = Settings::load_with_env(Some(file.path()), Vec::new()).unwrap();

    assert_eq!(settings.cassandra.contact_points().unwrap().len(), 2);
    assert_eq!(settings.cassandra.schema_action, SchemaAction::None);
    assert!(settings.cassandra.credentials().unwrap().is_none());
    assert_eq!(settings.logging.level, "warn");
    assert!(settings.logging.dir.is_none());
}

#[test]
fn environment_overrides_file_values() {
    let file = settings_file(FILE);
    let settings = Settings::load_with_env(
        Some(file.path()),
        vars(&[
            ("KEYSPACES__CASSANDRA__CONTACT_POINTS", "10.1.1.1"),
            ("KEYSPACES__CASSANDRA__SCHEMA_ACTION", "recreate"),
            ("KEYSPACES__CASSANDRA__CREATE_KEYSPACES", "false"),
            ("KEYSPACES__CASSANDRA__USERNAME", "app"),
            ("KEYSPACES__CASSANDRA__PASSWORD", "hunter2"),
            ("KEYSPACES__B__KEYSPACE_NAME", "Other_Keyspace"),
            ("UNRELATED__CASSANDRA__USERNAME", "ignored"),
        ]),
    )
    .unwrap();

    assert_eq!(
        settings.cassandra.contact_points().unwrap(),
        vec!["10.1.1.1:9042".to_string()]
    );
    assert_eq!(settings.cassandra.schema_action, SchemaAction::Recreate);
    assert!(!settings.cassandra.create_keyspaces);
    assert_eq!(
        settings.cassandra.credentials().unwrap().unwrap().username,
        "app"
    );
    assert_eq!(settings.b.keyspace().unwrap().as_str(), "other_keyspace");
}

#[test]
fn environment_alone_is_enough() {
    let settings = Settings::load_with_env(
        None,
        vars(&[
            ("KEYSPACES__CASSANDRA__CONTACT_POINTS", "localhost"),
            ("KEYSPACES__CASSANDRA__LOCAL_DATACENTER", "dc1"),
            ("KEYSPACES__A__KEYSPACE_NAME", "first"),
            ("KEYSPACES__B__KEYSPACE_NAME", "second"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.a.keyspace().unwrap().as_str(), "first");
    assert_eq!(settings.cassandra.schema_action, SchemaAction::None);
}

#[test]
fn numeric_looking_overrides_stay_text() {
    let file = settings_file(FILE);
    let settings = Settings::load_with_env(
        Some(file.path()),
        vars(&[
            ("KEYSPACES__CASSANDRA__USERNAME", "1e5"),
            ("KEYSPACES__CASSANDRA__PASSWORD", "007"),
            ("KEYSPACES__CASSANDRA__REPLICATION_FACTOR", "3"),
        ]),
    )
    .unwrap();

    let credentials = settings.cassandra.credentials().unwrap().unwrap();
    assert_eq!(credentials.username, "1e5");
    assert_eq!(credentials.password.expose_secret(), "007");
    assert_eq!(settings.cassandra.replication_factor, 3);
}

#[test]
fn environment_datacenter_factors_keep_their_names() {
    let with_datacenter = FILE.replace(
        "[a]",
        "[cassandra.replication-datacenters]\nDC1 = 3\n\n[a]",
    );
    let file = settings_file(&with_datacenter);
    let settings = Settings::load_with_env(
        Some(file.path()),
        vars(&[
            ("KEYSPACES__CASSANDRA__REPLICATION_DATACENTERS__DC_EAST", "2"),
            ("KEYSPACES__CASSANDRA__REPLICATION_DATACENTERS__DC1", "5"),
        ]),
    )
    .unwrap();

    assert_eq!(
        settings.cassandra.replication(),
        Replication::NetworkTopology {
            datacenters: BTreeMap::from([("DC1".to_string(), 5), ("DC_EAST".to_string(), 2)]),
        }
    );
}

#[test]
fn missing_required_keys_fail_to_load() {
    let err = Settings::load_with_env(None, Vec::new()).unwrap_err();
    assert!(matches!(err, SettingsError::Load(_)));
}

#[test]
fn validation_runs_on_load() {
    let blank_datacenter = FILE.replace("\"datacenter1\"", "\" \"");
    let file = settings_file(&blank_datacenter);
    assert!(matches!(
        Settings::load_with_env(Some(file.path()), Vec::new()),
        Err(SettingsError::MissingDatacenter)
    ));

    let no_hosts = FILE.replace("cassandra-1:9042,cassandra-2:9042", " , ");
    let file = settings_file(&no_hosts);
    assert!(matches!(
        Settings::load_with_env(Some(file.path()), Vec::new()),
        Err(SettingsError::EmptyContactPoints)
    ));

    let bad_keyspace = FILE.replace("b_keyspace", "b-keyspace");
    let file = settings_file(&bad_keyspace);
    assert!(matches!(
        Settings::load_with_env(Some(file.path()), Vec::new()),
        Err(SettingsError::InvalidKeyspace(_))
    ));
}
