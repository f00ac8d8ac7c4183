//! Query execution and table rendering.
//!
//! The executor is the boundary between the pipeline and the cluster: it
//! takes a validated query string and always comes back with a string —
//! either the rendered result table or an error message carrying the fixed
//! prefix. Exceptions never cross this boundary; downstream consumers branch
//! on the prefix instead.

use async_trait::async_trait;
use std::sync::Arc;

use super::auth::TokenProvider;
use super::types::QueryResult;
use super::KustoClient;
use crate::config::ClusterConfig;
use crate::extract::clean_query;

/// Maximum number of data rows rendered into a result table.
pub const MAX_RESULT_ROWS: usize = 100;

/// Marker line appended when a result was cut off at [`MAX_RESULT_ROWS`].
pub const TRUNCATION_MARKER: &str = "... (results truncated to first 100 rows)";

/// Prefix of every execution failure string.
pub const EXECUTION_ERROR_PREFIX: &str = "Error executing Kusto query: ";

/// Anything that can run a query string and produce rendered table text.
///
/// The production implementation is [`QueryExecutor`]; the mocks in
/// [`super::mock`] implement it directly for tests and demo runs.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Runs a query, returning rendered table text or an error string
    /// prefixed with [`EXECUTION_ERROR_PREFIX`]. Never fails the caller.
    async fn run_query(&self, query: &str) -> String;
}

/// Executes queries against a cluster, one session per call.
pub struct QueryExecutor {
    cluster: ClusterConfig,
    credential: Arc<dyn TokenProvider>,
}

impl QueryExecutor {
    /// Creates an executor for the given cluster.
    pub fn new(cluster: ClusterConfig, credential: Arc<dyn TokenProvider>) -> Self {
        Self {
            cluster,
            credential,
        }
    }

    /// Executes a single query and renders the result.
    ///
    /// The query is re-validated before a session is opened; each call gets
    /// its own client, dropped on every exit path.
    pub async fn execute(&self, query: &str) -> String {
        let Some(cleaned) = clean_query(query) else {
            return format!(
                "{}query failed validation and was not sent to the cluster",
                EXECUTION_ERROR_PREFIX
            );
        };

        match super::connect(&self.cluster, Arc::clone(&self.credential)) {
            Ok(client) => execute_with_client(client.as_ref(), &cleaned).await,
            Err(e) => format!("{}{}", EXECUTION_ERROR_PREFIX, e),
        }
    }
}

#[async_trait]
impl QueryRunner for QueryExecutor {
    async fn run_query(&self, query: &str) -> String {
        self.execute(query).await
    }
}

/// Runs a query against an already-open client and renders the result.
///
/// Re-applies cleaning/validation to the input as defense in depth.
pub async fn execute_with_client(client: &dyn KustoClient, query: &str) -> String {
    let Some(cleaned) = clean_query(query) else {
        return format!(
            "{}query failed validation and was not sent to the cluster",
            EXECUTION_ERROR_PREFIX
        );
    };

    match client.execute_query(&cleaned).await {
        Ok(result) => render_table(&result),
        Err(e) => format!("{}{}", EXECUTION_ERROR_PREFIX, e),
    }
}

/// Renders a query result into tab-delimited text.
///
/// First line is the tab-joined header; each data row follows with null
/// cells rendered as the literal `null`. Rows are capped at
/// [`MAX_RESULT_ROWS`], with [`TRUNCATION_MARKER`] appended when the source
/// had more.
pub fn render_table(result: &QueryResult) -> String {
    let mut lines = Vec::with_capacity(result.rows.len().min(MAX_RESULT_ROWS) + 2);

    lines.push(result.column_names().join("\t"));

    for row in result.rows.iter().take(MAX_RESULT_ROWS) {
        let cells: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
        lines.push(cells.join("\t"));
    }

    if result.rows.len() > MAX_RESULT_ROWS {
        lines.push(TRUNCATION_MARKER.to_string());
    }

    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kusto::mock::{FailingKustoClient, MockKustoClient};
    use crate::kusto::types::{ColumnInfo, Value};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_execute_renders_header_and_rows() {
        let client = MockKustoClient::with_result(QueryResult::with_data(
            vec![
                ColumnInfo::new("PoolName", "string"),
                ColumnInfo::new("NodeCount", "long"),
            ],
            vec![
                vec![Value::from("batch-east"), Value::Long(12)],
                vec![Value::from("batch-west"), Value::Long(8)],
            ],
        ));

        let text = execute_with_client(&client, "LogExecutionClusterInfo | take 2").await;

        assert_eq!(
            text,
            "PoolName\tNodeCount\nbatch-east\t12\nbatch-west\t8"
        );
    }

    #[tokio::test]
    async fn test_execute_truncates_at_100_rows() {
        let client = MockKustoClient::with_row_count(150);

        let text = execute_with_client(&client, "LogExecutionClusterInfo | take 150").await;

        let lines: Vec<&str> = text.lines().collect();
        // header + 100 data rows + marker
        assert_eq!(lines.len(), 102);
        assert_eq!(lines[0], "NodeCount");
        assert_eq!(lines[101], TRUNCATION_MARKER);
        assert_eq!(lines[100], "99");
    }

    #[tokio::test]
    async fn test_execute_exactly_100_rows_no_marker() {
        let client = MockKustoClient::with_row_count(100);

        let text = execute_with_client(&client, "LogExecutionClusterInfo | take 100").await;

        assert!(!text.contains(TRUNCATION_MARKER));
        assert_eq!(text.lines().count(), 101);
    }

    #[tokio::test]
    async fn test_null_cell_renders_as_null() {
        let client = MockKustoClient::with_result(QueryResult::with_data(
            vec![
                ColumnInfo::new("PoolName", "string"),
                ColumnInfo::new("QueuedJobCount", "long"),
            ],
            vec![vec![Value::from("batch-east"), Value::Null]],
        ));

        let text = execute_with_client(&client, "LogExecutionClusterInfo | take 1").await;

        assert_eq!(text, "PoolName\tQueuedJobCount\nbatch-east\tnull");
    }

    #[tokio::test]
    async fn test_invalid_query_not_sent() {
        let client = FailingKustoClient::new("should never be reached");

        let text = execute_with_client(&client, "DROP TABLE users").await;

        assert!(text.starts_with(EXECUTION_ERROR_PREFIX));
        assert!(text.contains("failed validation"));
    }

    #[tokio::test]
    async fn test_execution_failure_becomes_error_string() {
        let client = FailingKustoClient::new("semantic error near 'summarize'");

        let text = execute_with_client(&client, "LogExecutionClusterInfo | count").await;

        assert!(text.starts_with(EXECUTION_ERROR_PREFIX));
        assert!(text.contains("semantic error near 'summarize'"));
    }

    #[test]
    fn test_render_empty_result() {
        let result = QueryResult::with_data(vec![ColumnInfo::new("NodeCount", "long")], vec![]);
        assert_eq!(render_table(&result), "NodeCount");
    }
}
