use anyhow::Result;
use quill_agent::{Agent, KnowledgeBaseTool, ToolRegistry, WebSearchTool};
use quill_context::ConversationManager;
use quill_llm::ChatClient;
use quill_persist::PersistenceClient;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{GoogleVerifier, TokenService};
use crate::config::Config;
use crate::error::ApiError;

/// Shared application state passed to all handlers
///
/// Everything request-specific (the caller's id, the knowledge-base tool bound to it)
/// is built per request; nothing here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub conversations: ConversationManager,
    /// `None` when no LLM API key is configured
    pub llm_client: Option<Arc<dyn ChatClient>>,
    pub search_tool: Arc<WebSearchTool>,
    pub tokens: TokenService,
    pub google: GoogleVerifier,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        llm_client: Option<Arc<dyn ChatClient>>,
    ) -> Result<Self> {
        let conversations = ConversationManager::new(persist.clone().conversation_store())
            .with_policy(config.llm.context.clone())?;

        let mut search_tool = WebSearchTool::new(config.serper_api_key.clone())?
            .with_default_results(config.search.num_results)
            .with_timeout(Duration::from_secs(config.search.timeout_secs))?;
        if let Some(endpoint) = &config.search.endpoint {
            search_tool = search_tool.with_endpoint(endpoint.clone());
        }

        let tokens = TokenService::new(&config.jwt_secret, config.auth.token_expiry_minutes);
        let google = GoogleVerifier::new(
            config.google_client_id.clone(),
            config.auth.google_tokeninfo_url.clone(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            persist,
            conversations,
            llm_client,
            search_tool: Arc::new(search_tool),
            tokens,
            google,
        })
    }

    pub fn llm_client(&self) -> Result<Arc<dyn ChatClient>, ApiError> {
        self.llm_client.clone().ok_or_else(|| {
            ApiError::ServiceUnavailable("LLM API key is not configured".to_string())
        })
    }

    /// Agent for one chat turn, its knowledge-base tool bound to `user_id`
    pub fn agent_for(&self, user_id: &str, model: Option<&str>) -> Result<Agent, ApiError> {
        let tools = ToolRegistry::new()
            .register(self.search_tool.clone())
            .register(Arc::new(KnowledgeBaseTool::new(
                self.persist.clone().document_store(),
                user_id,
            )));

        let agent = Agent::builder()
            .llm_client(self.llm_client()?)
            .tools(Arc::new(tools))
            .config(self.config.llm.agent_config())
            .llm_config(self.config.llm.llm_config(model))
            .build()?;
        Ok(agent)
    }
}
