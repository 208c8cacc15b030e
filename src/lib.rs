pub mod api; // HTTP router, endpoints, server lifecycle
pub mod config;
pub mod editor; // Mind map editing state with per-node requests
pub mod export; // PDF / JPEG export
pub mod models;
pub mod pipeline; // Model + search workflows

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::llm::{AnthropicClient, LlmError};
use crate::pipeline::search::{EvidenceFetcher, GoogleSearchClient, SearchError};
use crate::pipeline::MindMapProcessor;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Model client: {0}")]
    Llm(#[from] LlmError),
    #[error("Search client: {0}")]
    Search(#[from] SearchError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Install the global tracing subscriber (`RUST_LOG`, or the default filter).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Build the model and search clients and wrap them in an `ApiContext`.
///
/// The clients are blocking `reqwest` clients: call this before entering
/// the async runtime, and drop the context after the runtime is gone.
pub fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    let llm = AnthropicClient::new(
        &config.anthropic_base_url,
        &config.anthropic_api_key,
        &config.model,
        config.llm_timeout,
    )?;
    let search = GoogleSearchClient::new(
        &config.search_base_url,
        config.search.clone(),
        config.search_timeout,
    )?;
    let search_configured = search.is_configured();
    if !search_configured {
        tracing::warn!("Search credentials missing, fact-checks will run without evidence");
    }

    let processor = MindMapProcessor::new(
        Arc::new(llm),
        EvidenceFetcher::new(Arc::new(search)),
    );
    Ok(ApiContext::new(processor, search_configured, config.max_upload_bytes))
}

/// Serve until Ctrl-C, then shut down gracefully.
pub async fn serve(ctx: ApiContext, bind: std::net::SocketAddr) -> Result<(), StartupError> {
    let mut server = api::start_server_on(ctx, bind).await?;
    tracing::info!(
        addr = %server.session.server_addr,
        session_id = %server.session.session_id,
        "Listening"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}

/// Process entry point: config → tracing → clients → runtime → server.
pub fn run() -> Result<(), StartupError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let ctx = build_context(&config)?;
    tracing::info!(model = %config.model, bind = %config.bind, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    let result = runtime.block_on(serve(ctx.clone(), config.bind));

    // Blocking clients must not be dropped inside the runtime.
    drop(runtime);
    drop(ctx);
    result
}
