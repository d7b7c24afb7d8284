use std::sync::Arc;

use stockcal_analysis::api::{run_server, AppState};
use stockcal_analysis::client::{AnalysisBackend, AnalysisClient};
use stockcal_analysis::config::{AppConfig, BackendKind};
use stockcal_analysis::credential::CredentialStore;
use stockcal_analysis::llm::LlmAnalyst;
use stockcal_analysis::session::AnalysisEngine;
use stockcal_analysis::transport::ReqwestTransport;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting StockCal analysis engine...");

    // Load Configuration
    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    if config.service.timeout_secs.is_none() {
        info!("ℹ️ No transport timeout configured - requests may stay pending indefinitely");
    }
    let transport = Arc::new(ReqwestTransport::new(config.service_timeout())?);

    let backend: Arc<dyn AnalysisBackend> = match config.backend {
        BackendKind::Service => {
            let base_url = config.service_url()?;
            info!("Using analysis service at {}", base_url);
            Arc::new(AnalysisClient::new(transport, base_url))
        }
        BackendKind::Llm => {
            let base_url = config.llm_url()?;
            info!("Using LLM Model: {} at {}", config.llm.model, base_url);
            Arc::new(LlmAnalyst::new(transport, base_url, config.llm.model.clone()))
        }
    };

    let credentials = CredentialStore::seeded(config.api_key.clone());
    if !credentials.is_configured() {
        warn!("⚠️ ANALYSIS_API_KEY not set - analyses fail until a key is saved via PUT /credential");
    }

    let engine = AnalysisEngine::new(credentials, backend, config.engine_options());

    // Log every session transition
    let mut updates = engine.updates();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => info!(
                    "📣 [BUS] Session {} is now {}",
                    update.session_id,
                    update.state.label()
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("📣 [BUS] Update logger lagged, skipped {} updates", skipped)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Start API Server
    info!("Initializing API Server...");
    let app_state = Arc::new(AppState { engine, config });
    run_server(app_state).await?;

    Ok(())
}
