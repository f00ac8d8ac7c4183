//! Prompt construction for the two pipeline phases.
//!
//! The drafting prompt asks the model to write KQL against the telemetry
//! table; the analysis prompt drives the tool-calling loop over the executed
//! results.

use crate::extract::TELEMETRY_TABLE;
use crate::llm::types::Message;

/// Reference schema of the telemetry table, injected into both prompts.
const TELEMETRY_SCHEMA: &str = "\
Table: LogExecutionClusterInfo (one row per pool per sampling interval)
  TIMESTAMP: datetime          - sampling time (UTC)
  PoolName: string             - compute pool identifier
  Region: string               - deployment region
  NodeCount: long              - provisioned nodes
  MaxNodeCount: long           - configured node ceiling
  ActiveJobCount: long         - jobs currently running
  QueuedJobCount: long         - jobs waiting for a node
  AvgCpuUtilization: real      - mean CPU percent across nodes
  AvgMemoryUtilization: real   - mean memory percent across nodes";

/// System prompt for the query-drafting phase.
const DRAFT_PROMPT_TEMPLATE: &str = r#"You are a capacity analyst for compute pools. Draft Kusto (KQL) queries that gather the telemetry needed to answer the operator's question.

{schema}

RULES:
- Query only the {table} table.
- Filter to the pool named "{pool}" and a recent time window unless the question says otherwise.
- Prefer summarize over raw dumps; keep result sets small.
- Draft 2-4 focused queries, each answering one aspect (utilization, queueing, headroom).

OUTPUT FORMAT:
Wrap every query in its own ```kql code block. Do not explain the queries."#;

/// System prompt for the analysis phase.
const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are a capacity analyst for compute pools. The drafted queries have been executed; their results are available through tools.

{schema}

RULES:
- Base every number you cite on tool output; never invent data.
- Start with get_available_queries, then drill into columns with calculate_statistics or extract_numeric_values.
- Treat results marked FAILED as unavailable; do not guess their contents.
- When you have enough evidence, stop calling tools and answer.

FINAL ANSWER FORMAT:
A short capacity recommendation for pool "{pool}": current state, whether to scale up, down, or hold, and the data supporting it."#;

/// Builds the system prompt for the query-drafting phase.
pub fn build_draft_prompt(pool: &str) -> String {
    DRAFT_PROMPT_TEMPLATE
        .replace("{schema}", TELEMETRY_SCHEMA)
        .replace("{table}", TELEMETRY_TABLE)
        .replace("{pool}", pool)
}

/// Builds the system prompt for the analysis phase.
pub fn build_analysis_prompt(pool: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{schema}", TELEMETRY_SCHEMA)
        .replace("{pool}", pool)
}

/// Builds the message list for the drafting request.
pub fn draft_messages(pool: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(build_draft_prompt(pool)),
        Message::user(question),
    ]
}

/// Builds the initial message list for the analysis loop.
///
/// `overview` is the output of `get_available_queries` over the executed
/// results, so the model starts with the lay of the land.
pub fn analysis_messages(pool: &str, question: &str, overview: &str) -> Vec<Message> {
    vec![
        Message::system(build_analysis_prompt(pool)),
        Message::user(format!(
            "Question: {}\n\nExecuted query results:\n{}",
            question, overview
        )),
    ]
}
