//! Mock LLM client for testing.
//!
//! Produces deterministic KQL drafts and a scripted tool-calling sequence so
//! the whole pipeline can run without an API key. Also backs `--mock` runs
//! of the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::tools::ToolDefinition;
use crate::llm::types::{LlmResponse, Message, Role, ToolCall};
use crate::llm::LlmClient;

/// Mock LLM client with canned drafting and analysis behavior.
///
/// The drafting phase returns fenced KQL for any capacity-sounding input.
/// The analysis phase walks a fixed script: inspect the available queries,
/// compute statistics on one column, then produce a recommendation.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response) checked first.
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern`, the mock returns
    /// `response` from `complete`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Generates a drafting response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("capacity")
            || input_lower.contains("pool")
            || input_lower.contains("node")
        {
            return "Utilization first:\n\n```kql\nLogExecutionClusterInfo\n| where TIMESTAMP > ago(7d)\n| summarize AvgCpu = avg(AvgCpuUtilization), MaxNodes = max(NodeCount) by bin(TIMESTAMP, 1h)\n```\n\nThen queueing pressure:\n\n```kql\nLogExecutionClusterInfo\n| where TIMESTAMP > ago(7d)\n| summarize AvgQueue = avg(QueuedJobCount) by bin(TIMESTAMP, 1h)\n```"
                .to_string();
        }

        "I need a pool name to draft telemetry queries.".to_string()
    }

    /// Extracts the last plain user message content.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User && m.tool_results.is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    /// Counts completed tool rounds in the conversation so far.
    fn tool_rounds(messages: &[Message]) -> usize {
        messages
            .iter()
            .filter(|m| !m.tool_results.is_empty())
            .count()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        if tools.is_empty() {
            let input = Self::extract_user_input(messages);
            return Ok(LlmResponse::text(self.mock_response(&input)));
        }

        match Self::tool_rounds(messages) {
            0 => Ok(LlmResponse::with_tool_calls(
                String::new(),
                vec![ToolCall {
                    id: "mock_call_1".to_string(),
                    name: "get_available_queries".to_string(),
                    arguments: "{}".to_string(),
                }],
            )),
            1 => Ok(LlmResponse::with_tool_calls(
                String::new(),
                vec![ToolCall {
                    id: "mock_call_2".to_string(),
                    name: "calculate_statistics".to_string(),
                    arguments: r#"{"query_name":"Query_1","column_name":"NodeCount"}"#.to_string(),
                }],
            )),
            _ => Ok(LlmResponse::text(
                "Recommendation: hold current capacity. Node counts and CPU utilization are \
                 within normal bounds for the sampled window.",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ToolResult;

    #[tokio::test]
    async fn test_mock_drafts_kql_for_capacity_question() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("Assess capacity for pool batch-east")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("```kql"));
        assert!(response.contains("LogExecutionClusterInfo"));
    }

    #[tokio::test]
    async fn test_mock_unknown_question() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("What is the meaning of life?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(!response.contains("```kql"));
    }

    #[tokio::test]
    async fn test_mock_custom_response() {
        let client = MockLlmClient::new()
            .with_response("special", "```kql\nLogExecutionClusterInfo | take 1\n```");

        let messages = vec![Message::user("run the special query")];
        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("take 1"));
    }

    #[tokio::test]
    async fn test_mock_tool_script() {
        let client = MockLlmClient::new();
        let tools = crate::llm::tools::tool_definitions();
        let mut messages = vec![Message::user("analyze the results")];

        let first = client.complete_with_tools(&messages, &tools).await.unwrap();
        assert!(first.has_tool_calls());
        assert_eq!(first.tool_calls[0].name, "get_available_queries");

        messages.push(Message::assistant_tool_calls("", first.tool_calls.clone()));
        messages.push(Message::tool_results(vec![ToolResult {
            tool_call_id: "mock_call_1".to_string(),
            content: "Query_1: SUCCESS".to_string(),
        }]));

        let second = client.complete_with_tools(&messages, &tools).await.unwrap();
        assert!(second.has_tool_calls());
        assert_eq!(second.tool_calls[0].name, "calculate_statistics");

        messages.push(Message::assistant_tool_calls("", second.tool_calls.clone()));
        messages.push(Message::tool_results(vec![ToolResult {
            tool_call_id: "mock_call_2".to_string(),
            content: "{\"count\": 6}".to_string(),
        }]));

        let third = client.complete_with_tools(&messages, &tools).await.unwrap();
        assert!(!third.has_tool_calls());
        assert!(third.content.contains("Recommendation"));
    }
}
