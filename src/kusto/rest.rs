//! Kusto REST API client.
//!
//! Talks to an Azure Data Explorer cluster over its v1 query endpoint
//! (`POST {endpoint}/v1/rest/query`). Each client owns its own HTTP session;
//! the executor creates one per query and drops it when the call returns.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::auth::TokenProvider;
use super::types::{ColumnInfo, QueryResult, Value};
use super::KustoClient;
use crate::config::ClusterConfig;
use crate::error::{KapacityError, Result};

/// Default timeout for query requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Kusto REST client bound to one cluster and database.
pub struct KustoRestClient {
    cluster: ClusterConfig,
    credential: Arc<dyn TokenProvider>,
    client: Client,
}

impl KustoRestClient {
    /// Creates a new client session for the given cluster.
    pub fn new(cluster: ClusterConfig, credential: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| KapacityError::cluster(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            cluster,
            credential,
            client,
        })
    }

    /// Maps an API error response to a KapacityError.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> KapacityError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return KapacityError::cluster(
                "authentication failed; refresh your credentials (az login)",
            );
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return KapacityError::cluster("access denied to the database");
        }

        if let Ok(error_response) = serde_json::from_str::<KustoErrorResponse>(body) {
            return KapacityError::query(error_response.error.message);
        }

        KapacityError::query(format!("query endpoint returned {}: {}", status, body))
    }
}

#[async_trait]
impl KustoClient for KustoRestClient {
    async fn execute_query(&self, query: &str) -> Result<QueryResult> {
        let token = self
            .credential
            .bearer_token(&self.cluster.endpoint)
            .await?;

        let url = format!("{}/v1/rest/query", self.cluster.endpoint.trim_end_matches('/'));
        let request = KustoQueryRequest {
            db: self.cluster.database.clone(),
            csl: query.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    KapacityError::query("query timed out")
                } else if e.is_connect() {
                    KapacityError::cluster(format!(
                        "failed to connect to {}",
                        self.cluster.endpoint
                    ))
                } else {
                    KapacityError::cluster(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KapacityError::cluster(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let response: KustoQueryResponse = serde_json::from_str(&body)
            .map_err(|e| KapacityError::query(format!("failed to parse response: {}", e)))?;

        // The v1 API returns the primary result as the first table; trailing
        // tables carry query metadata.
        let table = response
            .tables
            .into_iter()
            .next()
            .ok_or_else(|| KapacityError::query("response contained no result table"))?;

        Ok(table.into_result())
    }
}

// Kusto v1 REST API types.

#[derive(Debug, Serialize)]
struct KustoQueryRequest {
    db: String,
    csl: String,
}

#[derive(Debug, Deserialize)]
struct KustoQueryResponse {
    #[serde(rename = "Tables")]
    tables: Vec<RawTable>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(rename = "Columns")]
    columns: Vec<RawColumn>,
    #[serde(rename = "Rows")]
    rows: Vec<Vec<serde_json::Value>>,
}

impl RawTable {
    fn into_result(self) -> QueryResult {
        let columns = self
            .columns
            .into_iter()
            .map(|c| {
                let data_type = c.data_type.or(c.column_type).unwrap_or_default();
                ColumnInfo::new(c.column_name, data_type)
            })
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(Value::from).collect())
            .collect();

        QueryResult { columns, rows }
    }
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    #[serde(rename = "ColumnName")]
    column_name: String,
    #[serde(rename = "DataType")]
    data_type: Option<String>,
    #[serde(rename = "ColumnType")]
    column_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KustoErrorResponse {
    error: KustoError,
}

#[derive(Debug, Deserialize)]
struct KustoError {
    message: String,
}
