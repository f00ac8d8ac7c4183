//! End-to-end pipeline tests.
//!
//! Exercise the full draft → extract → execute → analyze flow against the
//! mock LLM and mock Kusto clients, with no network access.
//!
//! Run with: `cargo test --test pipeline_test`

use kapacity::analysis::{self, NamedResults};
use kapacity::extract::extract_queries;
use kapacity::kusto::executor::execute_with_client;
use kapacity::kusto::{
    FailingKustoClient, MockKustoClient, EXECUTION_ERROR_PREFIX, TRUNCATION_MARKER,
};
use kapacity::llm::service::{AdvisorService, AnalysisRequest};
use kapacity::llm::MockLlmClient;

fn sample_request() -> AnalysisRequest {
    AnalysisRequest {
        pool: "batch-east".to_string(),
        question: "Is pool batch-east running out of capacity?".to_string(),
    }
}

#[tokio::test]
async fn test_full_pipeline_with_mocks() {
    let service = AdvisorService::new(Box::new(MockLlmClient::new()));
    let runner = MockKustoClient::with_sample_telemetry();

    let report = service.run(&sample_request(), &runner).await.unwrap();

    // The mock drafts two distinct queries; both execute against the mock
    // telemetry table.
    assert_eq!(report.queries.len(), 2);
    assert_eq!(report.queries[0].name, "Query_1");
    assert_eq!(report.queries[1].name, "Query_2");
    for executed in &report.queries {
        assert!(!executed.failed());
        assert!(executed.query.contains("LogExecutionClusterInfo"));
        assert!(executed.output.contains('\t'));
    }

    assert!(report.recommendation.contains("Recommendation"));
}

#[tokio::test]
async fn test_pipeline_survives_cluster_failure() {
    let service = AdvisorService::new(Box::new(MockLlmClient::new()));
    let runner = FailingKustoClient::new("cluster unavailable");

    let report = service.run(&sample_request(), &runner).await.unwrap();

    // Failures are captured per query, and the analysis loop still runs to
    // a recommendation over the FAILED entries.
    assert!(!report.queries.is_empty());
    for executed in &report.queries {
        assert!(executed.failed());
        assert!(executed.output.starts_with(EXECUTION_ERROR_PREFIX));
    }
    assert!(!report.recommendation.is_empty());
}

#[tokio::test]
async fn test_extract_execute_analyze_by_hand() {
    // The same flow the service drives, wired manually: model text in,
    // statistics out.
    let model_output = "Here you go:\n\n```kql\nLogExecutionClusterInfo\n| where PoolName == \"batch-east\"\n| take 10\n```";

    let queries = extract_queries(model_output);
    assert_eq!(queries.len(), 1);

    let client = MockKustoClient::with_row_count(150);
    let mut results = NamedResults::new();
    for (index, query) in queries.iter().enumerate() {
        let output = execute_with_client(&client, query).await;
        results.insert(format!("Query_{}", index + 1), output);
    }

    let table = analysis::get_query_results(&results, "Query_1");
    assert!(table.contains(TRUNCATION_MARKER));

    // The truncation marker row is excluded from extraction, so exactly the
    // 100 rendered data rows survive.
    let stats_json = analysis::calculate_statistics(&table, "NodeCount");
    let stats: analysis::ColumnStatistics = serde_json::from_str(&stats_json).unwrap();
    assert_eq!(stats.count, 100);
    assert_eq!(stats.minimum, 0.0);
    assert_eq!(stats.maximum, 99.0);

    let summary = analysis::get_available_queries(&results);
    assert!(summary.contains("Query_1: SUCCESS"));

    let validation = analysis::validate_data_existence(&results, "Query_1", "NodeCount, PoolName");
    assert!(validation.contains("\"missing_columns\""));
    assert!(validation.contains("PoolName"));
    assert!(validation.contains("\"passed\": false"));
}
