use std::time::Duration;

use herald_common::config::AppConfig;
use herald_common::{db, redis_pool};
use herald_dispatcher::dispatcher::Dispatcher;
use herald_dispatcher::lock::RedisDispatchLock;
use herald_dispatcher::policy::RetryPolicy;
use herald_dispatcher::store::PgNotificationStore;
use herald_notifier::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_dispatcher=info".into()),
        )
        .json()
        .init();

    tracing::info!("Episode Herald dispatcher starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Connect to Redis
    let redis = redis_pool::create_redis_pool(&config.redis_url).await?;

    let mut dispatcher = Dispatcher::new(
        PgNotificationStore::new(pool),
        TelegramNotifier::new(config.telegram_bot_token.clone()),
        RetryPolicy::standard(),
        RedisDispatchLock::new(redis, config.dispatch_lock_ttl_secs),
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.dispatch_interval_ms));

    tracing::info!(
        interval_ms = config.dispatch_interval_ms,
        "Dispatch loop started"
    );

    // Run with graceful shutdown on Ctrl+C
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A failed pass is logged inside run_pass and retried on the
                // next tick; it must not take the service down.
                if let Err(err) = dispatcher.run_pass().await {
                    tracing::error!(error = %err, "Dispatch pass error");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal, stopping gracefully...");
                break;
            }
        }
    }

    tracing::info!("Episode Herald dispatcher stopped.");
    Ok(())
}
