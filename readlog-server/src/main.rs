//! readlog-server - Reading log HTTP service
//!
//! Serves a per-user book collection over REST plus an SSE stream of
//! collection snapshots. Default port 5780.

use anyhow::{Context, Result};
use clap::Parser;
use readlog_common::api::auth::load_shared_secret;
use readlog_common::config::{
    default_config_path, load_toml_config, resolve_gemini_api_key, CompiledDefaults,
    LoggingConfig, RootFolderInitializer, RootFolderResolver, StoreKind,
};
use readlog_common::db::init_database;
use readlog_common::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use readlog_common::store::{BookStore, MemoryBookStore, SqliteBookStore};
use readlog_server::services::GeminiClient;
use readlog_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MODULE_NAME: &str = "server";

#[derive(Debug, Parser)]
#[command(name = "readlog-server", version, about = "Reading log HTTP service")]
struct Args {
    /// Root folder holding readlog.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "READLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long, env = "READLOG_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(long, env = "READLOG_PORT")]
    port: Option<u16>,

    /// Keep books in memory only (nothing is written to disk)
    #[arg(long)]
    memory: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let toml = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => Default::default(),
    };

    init_tracing(&toml.logging)?;

    info!(
        "Starting readlog-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let defaults = CompiledDefaults::for_current_platform();
    let host = args.host.or(toml.host.clone()).unwrap_or(defaults.host);
    let port = args.port.or(toml.port).unwrap_or(defaults.port);
    let capacity = toml.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
    let store_kind = if args.memory {
        StoreKind::Memory
    } else {
        toml.store.unwrap_or_default()
    };

    let events = EventBus::new(capacity);
    let (store, shared_secret): (Arc<dyn BookStore>, i64) = match store_kind {
        StoreKind::Memory => {
            warn!("Using in-memory store; books are lost on exit and API auth is disabled");
            (Arc::new(MemoryBookStore::with_event_bus(events)), 0)
        }
        StoreKind::Sqlite => {
            let root_folder = RootFolderResolver::new(MODULE_NAME)
                .with_cli_arg(args.root_folder)
                .with_config_path(config_path)
                .resolve();

            let initializer = RootFolderInitializer::new(root_folder);
            initializer
                .ensure_directory_exists()
                .context("Failed to initialize root folder")?;

            let db_path = initializer.database_path();
            if initializer.database_exists() {
                info!("Opening existing database: {}", db_path.display());
            } else {
                info!("Creating new database: {}", db_path.display());
            }
            let pool = init_database(&db_path).await?;

            let secret = load_shared_secret(&pool).await?;
            if secret == 0 {
                info!("API authentication disabled (shared_secret = 0)");
            } else {
                info!("Loaded shared secret for API authentication");
            }

            (Arc::new(SqliteBookStore::with_event_bus(pool, events)), secret)
        }
    };

    let mut state = AppState::new(store, shared_secret);
    match resolve_gemini_api_key(&toml) {
        Some(key) => {
            state = state.with_suggester(Arc::new(GeminiClient::new(key)?));
            info!("AI metadata suggestions enabled");
        }
        None => info!("No Gemini API key configured; /api/suggest will return 503"),
    }

    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
