use anyhow::{Context, Result};
use braindump::calendar::{CalendarClient, CredentialProvider, EnvTokenProvider, HttpCalendarClient};
use braindump::chat::Orchestrator;
use braindump::classify::Classifier;
use braindump::config::AppConfig;
use braindump::llm::{CompletionBackend, LlmClient};
use braindump::server::{serve, AppState};
use braindump::store::NoteStore;
use braindump::tools::{calendar::CreateCalendarEventTool, ToolRegistry};
use chrono::{Local, Offset};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,braindump=debug")),
        )
        .init();

    let config = AppConfig::load();
    tracing::info!(
        "Starting braindump backend (model: {}, store: {})",
        config.llm_model,
        config.database_path
    );

    let backend: Arc<dyn CompletionBackend> = Arc::new(
        LlmClient::new(
            config.llm_api_url.clone(),
            config.llm_model.clone(),
            config.llm_api_key.clone(),
            config.llm_timeout(),
        )
        .context("Failed to build LLM client")?,
    );

    let classifier = Arc::new(Classifier::new(backend.clone()));

    let store = Arc::new(
        NoteStore::new(&config.database_path).context("Failed to open note store")?,
    );

    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(EnvTokenProvider::new(&config.calendar_token_env));
    let calendar: Arc<dyn CalendarClient> = Arc::new(
        HttpCalendarClient::new(
            config.calendar_events_url.clone(),
            config.timezone.clone(),
            credentials,
            config.llm_timeout(),
        )
        .context("Failed to build calendar client")?,
    );

    let registry = Arc::new(ToolRegistry::new());
    registry
        .register(Arc::new(CreateCalendarEventTool::new(
            calendar.clone(),
            Local::now().offset().fix(),
        )))
        .await;

    let orchestrator = Arc::new(Orchestrator::new(backend, registry));

    let state = AppState {
        classifier,
        calendar,
        store,
        orchestrator,
    };
    serve(state, &config.bind_addr).await
}
