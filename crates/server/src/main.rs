//! slidegen server binary.
//!
//! Opens the job database, wires the generation collaborators and serves the
//! HTTP API. Jobs left active by a previous process are not touched here;
//! the first poll of each one fails it as orphaned.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slidegen_core::generation::{BundleExporter, OpenAiClient};
use slidegen_core::{paths, FileStore};
use slidegen_db::Database;
use slidegen_server::jobs::{Generators, JobEnv};
use slidegen_server::{create_app, init_metrics, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slidegen_server=info,tower_http=info")),
        )
        .compact()
        .init();

    let config = Config::parse();
    init_metrics();

    let db = match &config.db_path {
        Some(path) => Database::new(path).await?,
        None => Database::open_default().await?,
    };

    let uploads = config
        .uploads_dir
        .clone()
        .or_else(paths::uploads_dir)
        .context("could not determine an uploads directory; set SLIDEGEN_UPLOADS_DIR")?;
    tokio::fs::create_dir_all(&uploads)
        .await
        .with_context(|| format!("creating {}", uploads.display()))?;
    let store = FileStore::new(uploads);

    let client = Arc::new(OpenAiClient::new(config.openai_config())?);
    if !client.is_configured() {
        tracing::warn!("OPENAI_API_KEY is not set; generation jobs will fail until it is");
    }

    let env = JobEnv {
        db,
        settings: Arc::new(config.generation_settings()),
        generators: Generators {
            text: client.clone(),
            image: client,
            exporter: Arc::new(BundleExporter::new(store.clone())),
        },
        store,
    };
    let workers = config.workers.max(1);
    let state = AppState::new(env, workers);
    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, workers, "slidegen listening");
    eprintln!("\n  slidegen v{} \u{2192} http://localhost:{}\n", env!("CARGO_PKG_VERSION"), config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
