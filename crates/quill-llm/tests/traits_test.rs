use quill_llm::{ChatOptions, ChatRequest, ChatResponse, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_chat_request_creation() {
    let request = ChatRequest::new("llama-3.1-8b-instant", vec![Message::human("Hello")]);

    assert_eq!(request.model, "llama-3.1-8b-instant");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.options, ChatOptions::default());
}

#[test]
fn test_chat_options_builder() {
    let tools = vec![Tool::new("test", "Test tool", json!({"type": "object"}))];

    let options = ChatOptions::new()
        .temperature(0.5)
        .max_tokens(200)
        .tools(tools)
        .tool_choice(ToolChoice::auto());

    assert_eq!(options.temperature, Some(0.5));
    assert_eq!(options.max_tokens, Some(200));
    assert!(options.tools.is_some());
    assert!(options.tool_choice.is_some());
}

#[test]
fn test_chat_response_helpers() {
    let text = ChatResponse::text("done");
    assert_eq!(text.content.as_deref(), Some("done"));
    assert!(!text.has_tool_calls());

    let calls = ChatResponse::tool_calls(vec![ToolCall::new("c", "t", "{}")]);
    assert!(calls.has_tool_calls());
    assert!(calls.content.is_none());

    assert!(!ChatResponse::tool_calls(vec![]).has_tool_calls());
}
