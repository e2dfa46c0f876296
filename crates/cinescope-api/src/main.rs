mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use cinescope_store::{StoreConfig, DEFAULT_TABLE};
use routes::{dashboard, filter_rows, upload};
use state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = StoreConfig {
        host: env_or("CINESCOPE_DB_HOST", "localhost"),
        port: env_or("CINESCOPE_DB_PORT", "5432")
            .parse()
            .context("CINESCOPE_DB_PORT is not a valid port")?,
        username: env_or("CINESCOPE_DB_USER", "postgres"),
        password: std::env::var("CINESCOPE_DB_PASSWORD")
            .context("CINESCOPE_DB_PASSWORD not set")?,
        database: env_or("CINESCOPE_DB_NAME", "imdb_movies"),
        table: env_or("CINESCOPE_TABLE", DEFAULT_TABLE),
    };
    let port: u16 = env_or("CINESCOPE_PORT", "3000")
        .parse()
        .context("CINESCOPE_PORT is not a valid port")?;

    let app_state = Arc::new(AppState::new(&config).await?);

    let router = Router::new()
        .route("/upload", post(upload))
        .route("/dashboard", get(dashboard))
        .route("/filter", post(filter_rows))
        .with_state(app_state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
