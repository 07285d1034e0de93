mod config;
mod errors;
mod llm_client;
mod routes;
mod state;
mod tagging;
mod taxonomy;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::taxonomy::Taxonomy;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},telemetry=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting study-tagger v{}", env!("CARGO_PKG_VERSION"));

    // The taxonomy must be complete before any extraction can run
    let taxonomy = Taxonomy::load_dir(&config.taxonomy_dir).with_context(|| {
        format!(
            "Failed to load taxonomy from {}",
            config.taxonomy_dir.display()
        )
    })?;

    let llm = LlmClient::new(config.llm_config()).context("Failed to build HTTP client")?;
    if llm.has_credential() {
        info!(
            "LLM client initialized (base_url: {}, default model: {})",
            config.llm_base_url, config.default_model
        );
    } else {
        warn!("DASHSCOPE_API_KEY is not set; extraction requests will be refused");
    }
    if config.langchain_api_key.is_some() {
        info!("Call telemetry enabled (project: {})", config.langchain_project);
    }

    let state = AppState {
        taxonomy: Arc::new(taxonomy),
        llm: Arc::new(llm),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
