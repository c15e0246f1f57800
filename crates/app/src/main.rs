use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use tokio::sync::watch;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "divvy={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let queue_db = parse_database(&settings.queue.database).await?;

    let engine = Arc::new(engine::Engine::builder().database(db.clone()).build().await?);
    let queue = Arc::new(engine::MutationQueue::new(queue_db));
    let sync = Arc::new(engine::SyncOrchestrator::new(engine.clone(), queue));

    // Seeded online so actions queued by a previous run are replayed at
    // startup.
    let (online_tx, online_rx) = watch::channel(true);

    let mut tasks = tokio::task::JoinSet::new();

    {
        let sync = sync.clone();
        tasks.spawn(async move {
            sync.run(online_rx).await;
        });
    }

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tasks.spawn(async move {
        if let Err(err) = server::run_with_listener(engine, sync, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    // The sender must outlive the tasks; dropping it would stop the
    // orchestrator loop.
    let _online = online_tx;
    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        settings::Database::Memory => String::from("sqlite::memory:"),
        settings::Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
