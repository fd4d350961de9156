//! `keyspaces` command line entry point.
//!
//! # Responsibility
//! - Load settings, initialize logging and bootstrap both keyspace stacks.
//! - Run the isolation demo or purge every repository.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keyspaces_core::{
    init_logging, Application, Cluster, EntityRepository, MemoryCluster, ScyllaCluster, Settings,
    A, B, C,
};
use log::info;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "keyspaces", version, about = "Keyspace-isolated repositories on one cluster")]
struct Cli {
    /// TOML settings file; `KEYSPACES__*` variables override its values.
    #[arg(long, env = "KEYSPACES_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Backend::Scylla)]
    backend: Backend,

    /// Overrides `logging.level`.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Cassandra or ScyllaDB through the CQL driver.
    Scylla,
    /// Process-local cluster; data is gone on exit.
    Memory,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Writes sample rows into both keyspaces and prints what each
    /// repository sees.
    Demo,
    /// Deletes every row of every repository.
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(settings.logging.level.as_str());
    init_logging(level, settings.logging.dir.as_deref()).context("failed to initialize logging")?;

    let cluster: Box<dyn Cluster> = match cli.backend {
        Backend::Scylla => Box::new(ScyllaCluster),
        Backend::Memory => Box::new(MemoryCluster::new()),
    };
    let app = Application::bootstrap(&settings, cluster.as_ref())
        .await
        .context("failed to bootstrap keyspaces")?;

    match cli.command {
        Command::Demo => demo(&app).await,
        Command::Purge => {
            app.purge().await.context("failed to purge repositories")?;
            println!(
                "purged keyspaces {} and {}",
                app.keyspace1().keyspace(),
                app.keyspace2().keyspace()
            );
            Ok(())
        }
    }
}

/// Stores rows with one shared primary key in both keyspaces, then reads
/// every repository back.
async fn demo(app: &Application) -> anyhow::Result<()> {
    let id = Uuid::new_v4();
    info!("event=cli_demo module=cli status=start id={id}");

    app.a_repository()
        .insert(&A::new(id, "shared", "written through keyspace1"))
        .await
        .context("failed to insert A")?;
    app.b_repository()
        .insert(&B::new(id, "shared", "written through keyspace2"))
        .await
        .context("failed to insert B")?;
    app.keyspace1_c_repository()
        .insert(&C::new(id, "shared", "keyspace1 copy"))
        .await
        .context("failed to insert C into keyspace1")?;
    app.keyspace2_c_repository()
        .insert(&C::new(id, "shared", "keyspace2 copy"))
        .await
        .context("failed to insert C into keyspace2")?;

    let keyspace1 = app.keyspace1().keyspace();
    let keyspace2 = app.keyspace2().keyspace();
    for row in app.a_repository().find_all().await? {
        println!("{keyspace1}.a  {row:?}");
    }
    for row in app.b_repository().find_all().await? {
        println!("{keyspace2}.a  {row:?}");
    }
    println!(
        "{keyspace1}.c  {:?}",
        app.keyspace1_c_repository().find_one_by_partition(&id).await?
    );
    println!(
        "{keyspace2}.c  {:?}",
        app.keyspace2_c_repository().find_one_by_partition(&id).await?
    );

    info!("event=cli_demo module=cli status=ok id={id}");
    Ok(())
}
