use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quill_api::{build_router, config::Config, AppState};
use quill_llm::{ChatClient, ClientFactory, ProviderConfig};
use quill_persist::PersistClientBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Quill API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Storage
    tracing::info!(backend = ?config.storage.backend, "Connecting to storage");
    let mut persist_builder = PersistClientBuilder::new()
        .backend(config.storage.backend)
        .database(config.storage.database.clone());
    if let Some(uri) = &config.mongodb_uri {
        persist_builder = persist_builder.mongodb_uri(uri.clone());
    }
    let persist = persist_builder.build().await?;
    tracing::info!(backend = persist.backend_name(), "Storage ready");

    // LLM client; chat answers 503 until a key is configured
    let llm_client: Option<Arc<dyn ChatClient>> = match &config.llm_api_key {
        Some(key) => {
            let mut provider = ProviderConfig::new(key.clone());
            if let Some(base_url) = &config.llm.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Some(ClientFactory::create_chat_client(provider)?)
        }
        None => {
            tracing::warn!("LLM_API_KEY not set, chat is disabled");
            None
        }
    };
    if config.serper_api_key.is_none() {
        tracing::warn!("SERPER_API_KEY not set, web search returns an error record");
    }
    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set, Google sign-in is disabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, persist, llm_client)?);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
