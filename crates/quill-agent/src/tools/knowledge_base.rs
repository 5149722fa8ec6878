use super::{AgentTool, ToolObservation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use quill_llm::Tool;
use quill_persist::DocumentStore;
use serde_json::{json, Value};
use std::sync::Arc;

const TOOL_NAME: &str = "knowledge_base_tool";

/// Reads one of the calling user's documents by id.
///
/// Bound to a store handle and a user id at construction, so each request gets its own
/// instance and lookups never cross tenants.
pub struct KnowledgeBaseTool {
    store: Arc<dyn DocumentStore>,
    user_id: String,
}

impl KnowledgeBaseTool {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub async fn lookup(&self, document_id: &str) -> Result<String> {
        let doc = self
            .store
            .get_document(&self.user_id, document_id)
            .await
            .context("document lookup failed")?;

        Ok(match doc {
            Some(doc) => doc.content,
            None => format!("Document with id {} not found.", document_id),
        })
    }
}

// Models send the id either as a string or as a bare number
fn document_id_arg(arguments: &Value) -> Result<String> {
    match arguments.get("document_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => anyhow::bail!("knowledge_base_tool expects a document_id"),
    }
}

#[async_trait]
impl AgentTool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn definition(&self) -> Tool {
        Tool::new(
            TOOL_NAME,
            "Fetch the full content of one of the user's stored documents by its ID.",
            json!({
                "type": "object",
                "properties": {
                    "document_id": {
                        "type": "string",
                        "description": "Identifier of the document"
                    }
                },
                "required": ["document_id"]
            }),
        )
    }

    async fn call(&self, arguments: Value) -> Result<ToolObservation> {
        let document_id = document_id_arg(&arguments)?;
        tracing::info!(document_id = %document_id, "knowledge base lookup");
        Ok(ToolObservation::Text(self.lookup(&document_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_accepts_string_and_number() {
        assert_eq!(document_id_arg(&json!({"document_id": " abc "})).unwrap(), "abc");
        assert_eq!(document_id_arg(&json!({"document_id": 42})).unwrap(), "42");
        assert!(document_id_arg(&json!({})).is_err());
        assert!(document_id_arg(&json!({"document_id": ""})).is_err());
    }
}
