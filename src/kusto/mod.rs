//! Kusto data source layer.
//!
//! Provides a trait-based interface to the query engine so the pipeline can
//! run against the real REST endpoint or an in-memory mock interchangeably.

pub mod auth;
pub mod executor;
pub mod mock;
mod rest;
mod types;

pub use auth::{AzureCliTokenProvider, StaticTokenProvider, TokenProvider, ACCESS_TOKEN_ENV};
pub use executor::{
    QueryExecutor, QueryRunner, EXECUTION_ERROR_PREFIX, MAX_RESULT_ROWS, TRUNCATION_MARKER,
};
pub use mock::{FailingKustoClient, MockKustoClient};
pub use rest::KustoRestClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use std::sync::Arc;

use crate::config::ClusterConfig;
use crate::error::Result;

/// Trait defining the interface to the query engine.
#[async_trait::async_trait]
pub trait KustoClient: Send + Sync {
    /// Executes a query and returns the primary result table.
    async fn execute_query(&self, query: &str) -> Result<QueryResult>;
}

/// Opens a client session against the given cluster.
///
/// The session holds its own HTTP client; dropping the returned box releases
/// it. Each executor call opens and drops its own session.
pub fn connect(
    cluster: &ClusterConfig,
    credential: Arc<dyn TokenProvider>,
) -> Result<Box<dyn KustoClient>> {
    let client = KustoRestClient::new(cluster.clone(), credential)?;
    Ok(Box::new(client))
}
