use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remit_core::cli::Cli;
use remit_core::config::Config;
use remit_core::provider::{HttpWithdrawalProvider, StubWithdrawalProvider, WithdrawalProvider};
use remit_core::services::dispatcher::Dispatcher;
use remit_core::services::query::QueryService;
use remit_core::services::recovery::run_recovery_watcher;
use remit_core::services::transfer::TransferExecutor;
use remit_core::services::withdrawal::WithdrawalExecutor;
use remit_core::{AppState, create_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Select the withdrawal provider implementation
    let provider: Arc<dyn WithdrawalProvider> = match &config.withdrawal_provider_url {
        Some(url) => {
            tracing::info!("Using HTTP withdrawal provider at {}", url);
            Arc::new(HttpWithdrawalProvider::new(url.clone()))
        }
        None => {
            tracing::warn!("WITHDRAWAL_PROVIDER_URL not set, using in-memory stub provider");
            Arc::new(StubWithdrawalProvider::new())
        }
    };

    // Worker pools, one per transaction type
    let dispatcher = Dispatcher::start(
        Arc::new(TransferExecutor::new(pool.clone())),
        Arc::new(WithdrawalExecutor::new(pool.clone(), provider)),
        cli.transfer_workers,
        cli.withdrawal_workers,
    );

    let query_service = QueryService::new(pool.clone());

    // Recovery watcher for transactions whose dispatch signal was lost
    tokio::spawn(run_recovery_watcher(
        query_service.clone(),
        dispatcher.clone(),
        Duration::from_millis(cli.recovery_interval_ms),
    ));

    let app_state = AppState {
        db: pool,
        dispatcher,
        query_service,
        start_time: Instant::now(),
    };
    let app = create_app(app_state);

    let port = cli.port.unwrap_or(config.server_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
