use crate::node::NodeType;
use crate::types::AgentState;

/// Decides which node runs next
pub trait Router: Send + Sync {
    fn next(&self, state: &AgentState, current: NodeType) -> NextNode;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextNode {
    LLM,
    Tool,
    End,
}

/// LLM -> Tool (when a call is pending) -> LLM -> ... -> End
pub struct SimpleRouter;

impl Router for SimpleRouter {
    fn next(&self, state: &AgentState, current: NodeType) -> NextNode {
        match current {
            NodeType::LLM => {
                if state.has_pending_tool_calls() {
                    NextNode::Tool
                } else {
                    NextNode::End
                }
            }
            NodeType::Tool => NextNode::LLM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMConfig;
    use quill_llm::{Message, ToolCall};

    #[test]
    fn test_routes_to_tool_when_call_pending() {
        let state = AgentState::new(
            vec![Message::ai_with_tools(vec![ToolCall::new("c1", "t", "{}")])],
            LLMConfig::default(),
        );
        assert_eq!(SimpleRouter.next(&state, NodeType::LLM), NextNode::Tool);
    }

    #[test]
    fn test_ends_on_plain_answer() {
        let state = AgentState::new(vec![Message::ai("done")], LLMConfig::default());
        assert_eq!(SimpleRouter.next(&state, NodeType::LLM), NextNode::End);
    }

    #[test]
    fn test_tool_always_returns_to_llm() {
        let state = AgentState::new(vec![], LLMConfig::default());
        assert_eq!(SimpleRouter.next(&state, NodeType::Tool), NextNode::LLM);
    }
}
