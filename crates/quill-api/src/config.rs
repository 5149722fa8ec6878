use config::{Config as ConfigLoader, ConfigError, Environment, File};
use quill_agent::types::DEFAULT_TEMPERATURE;
use quill_agent::{AgentConfig, LLMConfig};
use quill_context::ContextPolicy;
use quill_persist::StorageBackend;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default)]
    pub mongodb_uri: Option<String>,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default)]
    pub serper_api_key: Option<String>,
    #[serde(default)]
    pub google_client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Outer limit for any request, chat turns included
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongodb,
            database: "quill".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// OpenAI-compatible endpoint, Groq when unset
    pub base_url: Option<String>,
    pub max_iterations: usize,
    pub turn_timeout_secs: u64,
    /// How much stored history each turn sees
    pub context: ContextPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let llm = LLMConfig::default();
        let agent = AgentConfig::default();
        Self {
            model: llm.model,
            temperature: llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: None,
            base_url: None,
            max_iterations: agent.max_iterations,
            turn_timeout_secs: agent.turn_timeout.as_secs(),
            context: ContextPolicy::AllMessages,
        }
    }
}

impl LlmConfig {
    /// Model settings for one turn, `model` overriding the configured default
    pub fn llm_config(&self, model: Option<&str>) -> LLMConfig {
        let mut config = LLMConfig::new(model.unwrap_or(&self.model)).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new()
            .with_max_iterations(self.max_iterations)
            .with_timeout(Duration::from_secs(self.turn_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub num_results: usize,
    pub timeout_secs: u64,
    pub endpoint: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_results: 5,
            timeout_secs: 10,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_expiry_minutes: i64,
    pub bcrypt_cost: u32,
    pub google_tokeninfo_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry_minutes: 60,
            bcrypt_cost: 12,
            google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables shaped `QUILL_<SECTION>__<KEY>`, e.g. `QUILL_LLM__MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.load_secrets()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        config.try_deserialize()
    }

    fn load_secrets(&mut self) -> Result<(), ConfigError> {
        self.jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConfigError::Message("JWT_SECRET environment variable is required".to_string())
            })?;

        self.mongodb_uri = env_secret("MONGODB_URI");
        if self.storage.backend == StorageBackend::Mongodb && self.mongodb_uri.is_none() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required for the mongodb backend".to_string(),
            ));
        }

        self.llm_api_key = env_secret("LLM_API_KEY").or_else(|| env_secret("GROQ_API_KEY"));
        self.serper_api_key = env_secret("SERPER_API_KEY");
        self.google_client_id = env_secret("GOOGLE_CLIENT_ID");
        Ok(())
    }
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
