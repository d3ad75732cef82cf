mod config;
mod db;
mod errors;
mod interviews;
mod llm_client;
mod models;
mod routes;
mod state;
mod voice_client;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interviews::lifecycle::InterviewService;
use crate::interviews::queue::{AnalysisQueue, AnalysisWorker, RedisAnalysisQueue};
use crate::interviews::store::PgInterviewStore;
use crate::llm_client::{AnalysisProvider, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::voice_client::VapiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screening API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgInterviewStore::new(db));

    // Initialize Redis analysis queue
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue: Arc<dyn AnalysisQueue> = Arc::new(
        RedisAnalysisQueue::connect(&redis)
            .await
            .context("Failed to connect to Redis")?,
    );
    info!("Redis analysis queue connected");

    // Initialize call provider
    let calls = Arc::new(VapiClient::new(
        config.vapi_api_key.clone(),
        config.vapi_api_url.clone(),
    )?);
    info!("Vapi client initialized ({})", config.vapi_api_url);

    // Initialize analysis provider; missing key degrades to per-interview errors
    let analyzer: Option<Arc<dyn AnalysisProvider>> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(llm) as Arc<dyn AnalysisProvider>)
        }
        None => {
            warn!("ANTHROPIC_API_KEY is not set; every analysis will end in error");
            None
        }
    };

    let service = Arc::new(InterviewService::new(
        store,
        calls,
        analyzer,
        queue.clone(),
        config.vapi_phone_number_id.clone(),
    ));

    tokio::spawn(AnalysisWorker::new(service.clone(), queue).run());

    // Build router
    let app = build_router(AppState {
        interviews: service,
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
