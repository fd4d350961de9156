//! Runs against a real cluster:
//! `KEYSPACES_IT_CONTACT_POINTS=127.0.0.1:9042 cargo test -- --ignored`.

use keyspaces_core::{Application, EntityRepository, ScyllaCluster, Settings, C};
use uuid::Uuid;

fn settings(contact_points: &str) -> Settings {
    let username = std::env::var("KEYSPACES_IT_USERNAME").unwrap_or_else(|_| "cassandra".into());
    let password = std::env::var("KEYSPACES_IT_PASSWORD").unwrap_or_else(|_| "cassandra".into());
    let datacenter =
        std::env::var("KEYSPACES_IT_DATACENTER").unwrap_or_else(|_| "datacenter1".into());
    Settings::from_toml_str(&format!(
        r#"
        [cassandra]
        contact-points = "{contact_points}"
        local-datacenter = "{datacenter}"
        username = "{username}"
        password = "{password}"
        schema-action = "CREATE_IF_NOT_EXISTS"

        [a]
        keyspace-name = "a_keyspace"

        [b]
        keyspace-name = "b_keyspace"
        "#
    ))
    .unwrap()
}

#[tokio::test]
#[ignore = "needs a running Cassandra or ScyllaDB node"]
async fn same_primary_key_is_isolated_per_keyspace_on_a_real_cluster() {
    let contact_points = std::env::var("KEYSPACES_IT_CONTACT_POINTS")
        .expect("KEYSPACES_IT_CONTACT_POINTS must point at a cluster");
    let app = Application::bootstrap(&settings(&contact_points), &ScyllaCluster)
        .await
        .unwrap();
    app.purge().await.unwrap();

    let id = Uuid::new_v4();
    let c1 = C::new(id, "test1", "test1");
    let c2 = C::new(id, "test1", "test2");
    app.keyspace1_c_repository().insert(&c1).await.unwrap();
    app.keyspace2_c_repository().insert(&c2).await.unwrap();

    assert_eq!(
        app.keyspace1_c_repository().find_one_by_partition(&id).await.unwrap(),
        Some(c1)
    );
    assert_eq!(
        app.keyspace2_c_repository().find_one_by_partition(&id).await.unwrap(),
        Some(c2)
    );

    app.keyspace1_c_repository().delete_all().await.unwrap();
    assert_eq!(app.keyspace1_c_repository().count().await.unwrap(), 0);
    assert_eq!(app.keyspace2_c_repository().count().await.unwrap(), 1);

    app.purge().await.unwrap();
}
