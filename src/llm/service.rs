//! Advisor service orchestrating the analysis pipeline.
//!
//! Drives the full flow: ask the model to draft KQL, extract and validate
//! the queries, execute them one at a time, then run the tool-calling
//! analysis loop until the model produces a recommendation.
//!
//! The service owns the `NamedResults` mapping and passes it by reference to
//! the analysis functions; tool dispatch never mutates it and never fails —
//! a bad tool call gets a descriptive message back instead.

use std::time::Instant;

use crate::analysis::{self, NamedResults};
use crate::error::{KapacityError, Result};
use crate::extract::extract_queries;
use crate::kusto::{QueryRunner, EXECUTION_ERROR_PREFIX};
use crate::llm::tools::{tool_definitions, ColumnInput, QueryNameInput, ValidateInput};
use crate::llm::types::{Message, ToolResult};
use crate::llm::{prompt, LlmClient};

/// Default cap on analysis-loop tool rounds.
const DEFAULT_MAX_TOOL_TURNS: usize = 8;

/// An operator request for the advisor.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Compute pool under analysis.
    pub pool: String,
    /// The operator's question.
    pub question: String,
}

/// One executed query and its rendered outcome.
#[derive(Debug, Clone)]
pub struct ExecutedQuery {
    /// Assigned name (`Query_1`, `Query_2`, ...).
    pub name: String,
    /// The validated query text that was executed.
    pub query: String,
    /// Rendered table text or error string.
    pub output: String,
}

impl ExecutedQuery {
    /// Returns true if execution failed.
    pub fn failed(&self) -> bool {
        self.output.starts_with(EXECUTION_ERROR_PREFIX)
    }
}

/// Final output of an advisor run.
#[derive(Debug)]
pub struct AdvisorReport {
    /// Executed queries in execution order.
    pub queries: Vec<ExecutedQuery>,
    /// The model's capacity recommendation.
    pub recommendation: String,
}

/// Drives the draft → execute → analyze pipeline.
pub struct AdvisorService {
    client: Box<dyn LlmClient>,
    max_tool_turns: usize,
}

impl AdvisorService {
    /// Creates a new advisor service around an LLM client.
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }

    /// Sets the cap on analysis-loop tool rounds.
    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self
    }

    /// Runs the full pipeline for one request.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        runner: &dyn QueryRunner,
    ) -> Result<AdvisorReport> {
        let start = Instant::now();
        tracing::info!(pool = %request.pool, "Starting capacity analysis");

        let queries = self.draft_queries(request).await?;
        let (executed, results) = self.execute_queries(&queries, runner).await;
        let recommendation = self.analyze(request, &results).await?;

        tracing::info!(
            total_duration_ms = start.elapsed().as_millis(),
            query_count = executed.len(),
            "Capacity analysis complete"
        );

        Ok(AdvisorReport {
            queries: executed,
            recommendation,
        })
    }

    /// Drafting phase: one completion, then extraction.
    async fn draft_queries(&self, request: &AnalysisRequest) -> Result<Vec<String>> {
        let messages = prompt::draft_messages(&request.pool, &request.question);

        let llm_start = Instant::now();
        let draft = self.client.complete(&messages).await?;
        tracing::debug!(
            llm_duration_ms = llm_start.elapsed().as_millis(),
            response_len = draft.len(),
            "Received draft response"
        );

        let queries = extract_queries(&draft);
        if queries.is_empty() {
            return Err(KapacityError::llm(
                "model response contained no valid telemetry queries",
            ));
        }

        tracing::info!(query_count = queries.len(), "Extracted validated queries");
        Ok(queries)
    }

    /// Execution phase: sequential, one session per query, failures captured
    /// into that query's own error string.
    async fn execute_queries(
        &self,
        queries: &[String],
        runner: &dyn QueryRunner,
    ) -> (Vec<ExecutedQuery>, NamedResults) {
        let mut executed = Vec::with_capacity(queries.len());
        let mut results = NamedResults::new();

        for (index, query) in queries.iter().enumerate() {
            let name = format!("Query_{}", index + 1);
            let exec_start = Instant::now();
            let output = runner.run_query(query).await;

            let failed = output.starts_with(EXECUTION_ERROR_PREFIX);
            tracing::debug!(
                query = %name,
                duration_ms = exec_start.elapsed().as_millis(),
                failed,
                "Query executed"
            );
            if failed {
                tracing::warn!(query = %name, "Query execution failed: {}", output);
            }

            results.insert(name.as_str(), output.as_str());
            executed.push(ExecutedQuery {
                name,
                query: query.clone(),
                output,
            });
        }

        (executed, results)
    }

    /// Analysis phase: tool-calling loop over the executed results.
    async fn analyze(&self, request: &AnalysisRequest, results: &NamedResults) -> Result<String> {
        let tools = tool_definitions();
        let overview = analysis::get_available_queries(results);
        let mut messages =
            prompt::analysis_messages(&request.pool, &request.question, &overview);

        let mut response = self.client.complete_with_tools(&messages, &tools).await?;
        let mut turns = 0;

        while response.has_tool_calls() && turns < self.max_tool_turns {
            turns += 1;
            tracing::debug!(
                turn = turns,
                tool_count = response.tool_calls.len(),
                "Processing tool calls"
            );

            let mut tool_results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let content = self.execute_tool(&call.name, &call.arguments, results);
                tool_results.push(ToolResult {
                    tool_call_id: call.id.clone(),
                    content,
                });
            }

            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            messages.push(Message::tool_results(tool_results));

            response = self.client.complete_with_tools(&messages, &tools).await?;
        }

        if response.has_tool_calls() {
            tracing::warn!(
                max_tool_turns = self.max_tool_turns,
                "Analysis loop hit the tool turn cap before a final answer"
            );
        }

        if response.content.is_empty() {
            return Err(KapacityError::llm(
                "model did not produce a recommendation",
            ));
        }

        Ok(response.content)
    }

    /// Dispatches a tool call to the analysis functions.
    ///
    /// Total: unknown tools and malformed arguments come back as messages
    /// the model can read, never as errors.
    fn execute_tool(&self, name: &str, arguments: &str, results: &NamedResults) -> String {
        let start = Instant::now();
        tracing::debug!(tool_name = name, "Executing tool");

        let result = match name {
            "get_available_queries" => analysis::get_available_queries(results),
            "get_query_results" => match serde_json::from_str::<QueryNameInput>(arguments) {
                Ok(input) => analysis::get_query_results(results, &input.query_name),
                Err(e) => bad_arguments(name, &e),
            },
            "extract_numeric_values" => match serde_json::from_str::<ColumnInput>(arguments) {
                Ok(input) => match results.get(&input.query_name) {
                    Some(table) => analysis::extract_numeric_values(table, &input.column_name),
                    None => analysis::get_query_results(results, &input.query_name),
                },
                Err(e) => bad_arguments(name, &e),
            },
            "calculate_statistics" => match serde_json::from_str::<ColumnInput>(arguments) {
                Ok(input) => match results.get(&input.query_name) {
                    Some(table) => analysis::calculate_statistics(table, &input.column_name),
                    None => analysis::get_query_results(results, &input.query_name),
                },
                Err(e) => bad_arguments(name, &e),
            },
            "validate_data_existence" => match serde_json::from_str::<ValidateInput>(arguments) {
                Ok(input) => analysis::validate_data_existence(
                    results,
                    &input.query_name,
                    &input.expected_columns,
                ),
                Err(e) => bad_arguments(name, &e),
            },
            _ => {
                tracing::warn!(tool_name = name, "Unknown tool requested");
                format!("Unknown tool: {}", name)
            }
        };

        tracing::debug!(
            tool_name = name,
            duration_ms = start.elapsed().as_millis(),
            result_len = result.len(),
            "Tool execution complete"
        );

        result
    }
}

fn bad_arguments(tool: &str, error: &serde_json::Error) -> String {
    format!("Invalid arguments for {}: {}", tool, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kusto::MockKustoClient;
    use crate::llm::MockLlmClient;

    fn sample_request() -> AnalysisRequest {
        AnalysisRequest {
            pool: "batch-east".to_string(),
            question: "Do we need more capacity in pool batch-east?".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_produces_recommendation() {
        let service = AdvisorService::new(Box::new(MockLlmClient::new()));
        let runner = MockKustoClient::with_sample_telemetry();

        let report = service.run(&sample_request(), &runner).await.unwrap();

        assert!(!report.queries.is_empty());
        assert!(report.queries.iter().all(|q| !q.failed()));
        assert!(report.recommendation.contains("Recommendation"));
    }

    #[tokio::test]
    async fn test_run_fails_without_queries() {
        let client = MockLlmClient::new().with_response(
            "batch-east",
            "I cannot draft queries for that pool.",
        );
        let service = AdvisorService::new(Box::new(client));
        let runner = MockKustoClient::with_sample_telemetry();

        let err = service.run(&sample_request(), &runner).await.unwrap_err();

        assert!(err.to_string().contains("no valid telemetry queries"));
    }

    #[tokio::test]
    async fn test_failed_query_is_captured_not_fatal() {
        let service = AdvisorService::new(Box::new(MockLlmClient::new()));
        let runner = crate::kusto::FailingKustoClient::new("cluster unavailable");

        let report = service.run(&sample_request(), &runner).await.unwrap();

        assert!(report.queries.iter().all(|q| q.failed()));
        assert!(!report.recommendation.is_empty());
    }

    #[test]
    fn test_execute_tool_dispatch() {
        let service = AdvisorService::new(Box::new(MockLlmClient::new()));
        let mut results = NamedResults::new();
        results.insert("Query_1", "NodeCount\n10\n12");

        let overview = service.execute_tool("get_available_queries", "{}", &results);
        assert!(overview.contains("Query_1: SUCCESS"));

        let stats = service.execute_tool(
            "calculate_statistics",
            r#"{"query_name":"Query_1","column_name":"NodeCount"}"#,
            &results,
        );
        assert!(stats.contains("\"count\": 2"));

        let missing = service.execute_tool(
            "calculate_statistics",
            r#"{"query_name":"Query_9","column_name":"NodeCount"}"#,
            &results,
        );
        assert!(missing.contains("No results found"));

        let unknown = service.execute_tool("drop_table", "{}", &results);
        assert!(unknown.contains("Unknown tool"));

        let malformed = service.execute_tool("get_query_results", "not json", &results);
        assert!(malformed.contains("Invalid arguments"));
    }
}
