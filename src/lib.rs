mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod extractors;
mod handlers;
mod models;

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use config::{Config, DEFAULT_LOG_FILTER};
pub use data_formats::*;
pub use errors::{RequestErrorJson, RequestErrorJsonWrapper};
use handlers::*;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use tower_http::trace::TraceLayer;
pub type JsonResponse<T> = (StatusCode, Json<T>);

pub async fn run_app(app: Router, listener: TcpListener, db: SqlitePool) -> Result<()> {
    let app = app
        .layer(Extension(Arc::new(db)))
        .layer(TraceLayer::new_for_http());
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::info!("Database already exists");
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid database url {db_url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_release(|conn, _| Box::pin(db_helpers::rollback_abandoned(conn)))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running Migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations completed");
    Ok(pool)
}

pub fn bind_listener(address: SocketAddr) -> Result<(SocketAddr, TcpListener)> {
    let listener =
        TcpListener::bind(address).with_context(|| format!("Could not bind {address}"))?;
    let local_addr = listener.local_addr()?;
    Ok((local_addr, listener))
}

pub fn make_router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/posts", get(get_user_posts))
        .route("/posts", post(create_post).get(list_posts))
        .route(
            "/posts/:id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/:id/comments", get(get_post_comments))
        .route("/posts/:id/tags/:tag_id", post(attach_tag_to_post))
        .route("/comments", post(create_comment).get(list_comments))
        .route("/comments/post/:post_id", post(create_comment_for_post))
        .route(
            "/comments/:id",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .route("/tags", post(create_tag).get(list_tags))
        .route(
            "/tags/:id",
            get(get_tag).put(update_tag).delete(delete_tag),
        )
        .fallback(not_found)
}
