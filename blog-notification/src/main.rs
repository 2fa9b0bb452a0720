use std::sync::Arc;

use blog_notification::clock::SystemClock;
use blog_notification::config::AppConfig;
use blog_notification::scheduler;
use blog_notification::state::AppState;
use blog_notification::store::PgStore;
use blog_shared::clients::db::create_pool;
use blog_shared::clients::email::EmailClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    blog_shared::telemetry::init_tracing("blog-notification");

    let config = AppConfig::load()?;

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let store = Arc::new(PgStore::new(pool));
    let email = Arc::new(EmailClient::new(
        &config.resend_api_key,
        &config.from_email,
        &config.from_name,
    ));

    let state = Arc::new(AppState::new(config, store, email, Arc::new(SystemClock)));

    let mut scheduler = scheduler::start_scheduler(state.clone()).await?;
    tracing::info!("blog-notification worker running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, stopping scheduler");
    scheduler.shutdown().await?;

    Ok(())
}
