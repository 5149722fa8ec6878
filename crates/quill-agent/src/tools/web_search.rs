use super::{AgentTool, ToolObservation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use quill_llm::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

const TOOL_NAME: &str = "google_search_tool";
const DEFAULT_NUM_RESULTS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Web search through the Serper REST API.
///
/// Never fails: a missing key or any transport/status/parse problem comes back as a
/// single `{"error": ...}` record.
pub struct WebSearchTool {
    http_client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    default_num_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    num_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: SERPER_ENDPOINT.to_string(),
            default_num_results: DEFAULT_NUM_RESULTS,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_default_results(mut self, num_results: usize) -> Self {
        self.default_num_results = num_results;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(self)
    }

    /// Up to `num_results` `{title, link, snippet}` records, or one error record
    pub async fn search(&self, query: &str, num_results: usize) -> Vec<Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            return vec![json!({ "error": "SERPER_API_KEY not set" })];
        };

        match self.fetch(api_key, query, num_results).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                vec![json!({ "error": e.to_string() })]
            }
        }
    }

    async fn fetch(&self, api_key: &str, query: &str, num_results: usize) -> Result<Vec<Value>> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query }))
            .send()
            .await
            .context("search request failed")?
            .error_for_status()?;

        let body: SerperResponse = response
            .json()
            .await
            .context("invalid search response")?;

        Ok(body
            .organic
            .into_iter()
            .take(num_results)
            .map(|item| {
                json!({
                    "title": item.title,
                    "link": item.link,
                    "snippet": item.snippet,
                })
            })
            .collect())
    }
}

#[async_trait]
impl AgentTool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> Tool {
        Tool::new(
            TOOL_NAME,
            "Perform a Google web search for up-to-date external information. \
             Returns a list of results with title, link and snippet.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "default": DEFAULT_NUM_RESULTS
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn call(&self, arguments: Value) -> Result<ToolObservation> {
        let args: SearchArgs =
            serde_json::from_value(arguments).context("google_search_tool expects a query")?;
        let num_results = args.num_results.unwrap_or(self.default_num_results);

        tracing::info!(query = %args.query, num_results, "running web search");
        Ok(ToolObservation::Records(self.search(&args.query, num_results).await))
    }
}
