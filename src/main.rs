use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blog_api::config::{AppConfig, Environment};
use blog_api::database::models::COLLECTIONS;
use blog_api::database::{MemoryStore, PgStore, Store};
use blog_api::{build_app, AppState};

#[derive(Debug, Parser)]
#[command(name = "blog-api-rust", version, about = "Blog REST API server")]
struct Args {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Use the in-process store even when DATABASE_URL is set
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and keys
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if config.environment != Environment::Development {
        config.validate().context("invalid configuration")?;
    }
    tracing::info!("Starting Blog API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match (&config.database.url, args.memory) {
        (Some(_), false) => {
            let store = PgStore::connect(&config.database).await?;
            store.ensure_collections(COLLECTIONS).await?;
            Arc::new(store)
        }
        _ => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Blog API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
