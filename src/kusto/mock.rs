//! Mock Kusto clients for testing.
//!
//! Provide in-memory result tables so the pipeline can run without a
//! cluster. The mocks also power `--mock` demo runs of the binary.

use async_trait::async_trait;

use super::executor::{self, QueryRunner};
use super::types::{ColumnInfo, QueryResult, Value};
use super::KustoClient;
use crate::error::{KapacityError, Result};

/// A mock Kusto client that returns a predefined result for every query.
#[derive(Debug, Clone)]
pub struct MockKustoClient {
    result: QueryResult,
}

impl MockKustoClient {
    /// Creates a mock client returning an empty result.
    pub fn new() -> Self {
        Self {
            result: QueryResult::default(),
        }
    }

    /// Creates a mock client returning the given result.
    pub fn with_result(result: QueryResult) -> Self {
        Self { result }
    }

    /// Creates a mock client with a small plausible telemetry table.
    pub fn with_sample_telemetry() -> Self {
        let columns = vec![
            ColumnInfo::new("TIMESTAMP", "datetime"),
            ColumnInfo::new("PoolName", "string"),
            ColumnInfo::new("NodeCount", "long"),
            ColumnInfo::new("AvgCpuUtilization", "real"),
            ColumnInfo::new("QueuedJobCount", "long"),
        ];
        let rows = (0..6)
            .map(|h| {
                vec![
                    Value::from(format!("2026-08-07T0{}:00:00Z", h)),
                    Value::from("batch-east"),
                    Value::Long(10 + h),
                    Value::Real(55.0 + h as f64 * 5.0),
                    Value::Long(3 * h),
                ]
            })
            .collect();
        Self {
            result: QueryResult::with_data(columns, rows),
        }
    }

    /// Creates a mock client whose result has `count` single-column rows.
    ///
    /// Useful for exercising the render cap.
    pub fn with_row_count(count: usize) -> Self {
        let columns = vec![ColumnInfo::new("NodeCount", "long")];
        let rows = (0..count).map(|i| vec![Value::Long(i as i64)]).collect();
        Self {
            result: QueryResult::with_data(columns, rows),
        }
    }
}

impl Default for MockKustoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KustoClient for MockKustoClient {
    async fn execute_query(&self, _query: &str) -> Result<QueryResult> {
        Ok(self.result.clone())
    }
}

#[async_trait]
impl QueryRunner for MockKustoClient {
    async fn run_query(&self, query: &str) -> String {
        executor::execute_with_client(self, query).await
    }
}

/// A mock Kusto client that fails every query with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingKustoClient {
    message: String,
}

impl FailingKustoClient {
    /// Creates a failing client with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl KustoClient for FailingKustoClient {
    async fn execute_query(&self, _query: &str) -> Result<QueryResult> {
        Err(KapacityError::query(self.message.clone()))
    }
}

#[async_trait]
impl QueryRunner for FailingKustoClient {
    async fn run_query(&self, query: &str) -> String {
        executor::execute_with_client(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_sample_telemetry() {
        let client = MockKustoClient::with_sample_telemetry();
        let result = client
            .execute_query("LogExecutionClusterInfo | take 10")
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 6);
        assert_eq!(result.column_names()[0], "TIMESTAMP");
    }

    #[tokio::test]
    async fn test_failing_client_errors() {
        let client = FailingKustoClient::new("cluster unavailable");
        let err = client
            .execute_query("LogExecutionClusterInfo")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cluster unavailable"));
    }
}
