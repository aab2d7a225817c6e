use anyhow::Context;
use blog_api::{bind_listener, init_db, make_router, run_app, Config, DEFAULT_LOG_FILTER};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Blog Platform API v{}", env!("CARGO_PKG_VERSION"));
    if let Err(error) = start().await {
        tracing::error!("Server failed: {:#}", error);
        std::process::exit(1);
    }
}

async fn start() -> blog_api::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let db = init_db(&config.database_url).await?;
    let (addr, listener) = bind_listener(config.bind_address)?;
    tracing::info!("Server started on {}", addr);
    run_app(make_router(), listener, db).await
}
