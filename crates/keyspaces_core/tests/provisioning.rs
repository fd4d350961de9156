use keyspaces_core::cql::memory::KeyspaceOptions;
use keyspaces_core::cql::{ColumnKind, ColumnSpec, CqlType, Statement, TableSpec};
use keyspaces_core::model::{global, keyspace1};
use keyspaces_core::{
    Application, BootstrapError, EntityRepository, KeyspaceName, KeyspaceStack, MemoryCluster,
    RepoError, Replication, SchemaAction, SchemaError, SessionProvisioner, Settings, StoreError,
    A, C,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn settings(schema_action: &str, extra: &str) -> Settings {
    Settings::from_toml_str(&format!(
        r#"
        [cassandra]
        contact-points = "127.0.0.1"
        local-datacenter = "datacenter1"
        schema-action = "{schema_action}"
        {extra}

        [a]
        keyspace-name = "a_keyspace"

        [b]
        keyspace-name = "b_keyspace"
        "#
    ))
    .unwrap()
}

async fn keyspace1_stack(
    cluster: &MemoryCluster,
    settings: &Settings,
) -> Result<KeyspaceStack, BootstrapError> {
    KeyspaceStack::bootstrap(
        cluster,
        &settings.cassandra,
        settings.a.keyspace().unwrap(),
        &[keyspace1::namespace(), global::namespace()],
    )
    .await
}

fn unused_table() -> Statement {
    Statement::CreateTable {
        table: TableSpec {
            name: "legacy".to_string(),
            columns: vec![ColumnSpec {
                name: "id".to_string(),
                cql_type: CqlType::Uuid,
                kind: ColumnKind::PartitionKey,
            }],
        },
        if_not_exists: false,
    }
}

#[tokio::test]
async fn provisioning_creates_keyspace_once_with_simple_replication() {
    let cluster = MemoryCluster::new();
    let settings = settings("NONE", "");
    let provisioner = SessionProvisioner::new(&cluster, &settings.cassandra);
    let keyspace = KeyspaceName::parse("a_keyspace").unwrap();

    let first = provisioner.provision(&keyspace).await.unwrap();
    let second = provisioner.provision(&keyspace).await.unwrap();

    assert_eq!(first.keyspace(), Some(&keyspace));
    assert_eq!(second.keyspace(), Some(&keyspace));
    assert_eq!(cluster.keyspace_names().unwrap(), vec!["a_keyspace".to_string()]);
    assert_eq!(
        cluster.keyspace_options("a_keyspace").unwrap(),
        Some(KeyspaceOptions {
            replication: Replication::Simple {
                replication_factor: 1
            },
            durable_writes: true,
        })
    );
}

#[tokio::test]
async fn provisioning_uses_configured_datacenter_factors() {
    let cluster = MemoryCluster::new();
    let settings = settings("NONE", "[cassandra.replication-datacenters]\ndc1 = 3");
    let keyspace = KeyspaceName::parse("a_keyspace").unwrap();
    SessionProvisioner::new(&cluster, &settings.cassandra)
        .provision(&keyspace)
        .await
        .unwrap();

    let options = cluster.keyspace_options("a_keyspace").unwrap().unwrap();
    assert_eq!(
        options.replication,
        Replication::NetworkTopology {
            datacenters: BTreeMap::from([("dc1".to_string(), 3)]),
        }
    );
}

#[tokio::test]
async fn disabled_keyspace_creation_fails_on_missing_keyspace() {
    let cluster = MemoryCluster::new();
    let settings = settings("NONE", "create-keyspaces = false");
    let keyspace = KeyspaceName::parse("a_keyspace").unwrap();

    let err = SessionProvisioner::new(&cluster, &settings.cassandra)
        .provision(&keyspace)
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        BootstrapError::Store(StoreError::KeyspaceNotFound(name)) if name == "a_keyspace"
    ));
    assert!(cluster.keyspace_names().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_credentials_abort_bootstrap() {
    let cluster = MemoryCluster::with_credentials("cassandra", "cassandra");
    let settings = settings("NONE", "username = \"cassandra\"\npassword = \"wrong\"");

    let err = Application::bootstrap(&settings, &cluster).await.err().unwrap();

    assert!(matches!(
        err,
        BootstrapError::Store(StoreError::Authentication(user)) if user == "cassandra"
    ));
}

#[tokio::test]
async fn schema_action_none_leaves_tables_missing() {
    let cluster = MemoryCluster::new();
    let settings = settings("NONE", "");
    let stack = keyspace1_stack(&cluster, &settings).await.unwrap();

    assert!(cluster.table_names("a_keyspace").unwrap().is_empty());
    let err = stack
        .repository::<A>()
        .unwrap()
        .insert(&A::new(Uuid::new_v4(), "k", "v"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::TableNotFound { .. })));
}

#[tokio::test]
async fn schema_action_create_fails_when_tables_exist() {
    let cluster = MemoryCluster::new();
    let settings = settings("CREATE", "");
    keyspace1_stack(&cluster, &settings).await.unwrap();

    assert_eq!(
        cluster.table_names("a_keyspace").unwrap(),
        vec!["a".to_string(), "c".to_string()]
    );
    let err = keyspace1_stack(&cluster, &settings).await.err().unwrap();
    assert!(matches!(
        err,
        BootstrapError::Schema(SchemaError::Store(StoreError::TableExists { .. }))
    ));
}

#[tokio::test]
async fn schema_action_create_if_not_exists_keeps_data() {
    let cluster = MemoryCluster::new();
    let settings = settings("CREATE_IF_NOT_EXISTS", "");
    let a = A::new(Uuid::new_v4(), "k", "v");
    let first = keyspace1_stack(&cluster, &settings).await.unwrap();
    first.repository::<A>().unwrap().insert(&a).await.unwrap();

    let second = keyspace1_stack(&cluster, &settings).await.unwrap();

    assert_eq!(
        second.repository::<A>().unwrap().find_all().await.unwrap(),
        vec![a]
    );
}

#[tokio::test]
async fn schema_action_recreate_wipes_mapped_tables_only() {
    let cluster = MemoryCluster::new();
    let create = settings("CREATE_IF_NOT_EXISTS", "");
    let stack = keyspace1_stack(&cluster, &create).await.unwrap();
    stack
        .repository::<A>()
        .unwrap()
        .insert(&A::new(Uuid::new_v4(), "k", "v"))
        .await
        .unwrap();
    stack.session().execute(&unused_table()).await.unwrap();

    let recreated = keyspace1_stack(&cluster, &settings("RECREATE", "")).await.unwrap();

    assert_eq!(recreated.repository::<A>().unwrap().count().await.unwrap(), 0);
    assert_eq!(
        cluster.table_names("a_keyspace").unwrap(),
        vec!["a".to_string(), "c".to_string(), "legacy".to_string()]
    );
}

#[tokio::test]
async fn schema_action_recreate_drop_unused_removes_unmapped_tables() {
    let cluster = MemoryCluster::new();
    let stack = keyspace1_stack(&cluster, &settings("CREATE_IF_NOT_EXISTS", ""))
        .await
        .unwrap();
    stack.session().execute(&unused_table()).await.unwrap();

    keyspace1_stack(&cluster, &settings("RECREATE_DROP_UNUSED", ""))
        .await
        .unwrap();

    assert_eq!(
        cluster.table_names("a_keyspace").unwrap(),
        vec!["a".to_string(), "c".to_string()]
    );
}

#[tokio::test]
async fn schema_actions_only_touch_the_bound_keyspace() {
    let cluster = MemoryCluster::new();
    let settings = settings("CREATE_IF_NOT_EXISTS", "");
    let app = Application::bootstrap(&settings, &cluster).await.unwrap();
    app.keyspace2_c_repository()
        .insert(&C::new(Uuid::new_v4(), "k", "v"))
        .await
        .unwrap();

    app.keyspace1()
        .apply_schema(SchemaAction::RecreateDropUnused)
        .await
        .unwrap();

    assert_eq!(app.keyspace2_c_repository().count().await.unwrap(), 1);
    assert_eq!(
        cluster.table_names("b_keyspace").unwrap(),
        vec!["a".to_string(), "c".to_string()]
    );
}
