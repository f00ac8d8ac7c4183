//! Kapacity - an AI-assisted capacity advisor for compute pools.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kapacity::cli::Cli;
use kapacity::config::Config;
use kapacity::error::{KapacityError, Result};
use kapacity::kusto::{
    AzureCliTokenProvider, MockKustoClient, QueryExecutor, StaticTokenProvider, TokenProvider,
};
use kapacity::llm::service::{AdvisorReport, AdvisorService, AnalysisRequest};
use kapacity::llm::{create_client, LlmProvider};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.cluster.apply_env_defaults();
    cli.apply_to(&mut config);

    let pool = config
        .cluster
        .pool
        .clone()
        .ok_or_else(|| KapacityError::config("no pool specified (use --pool or [cluster].pool)"))?;

    let request = AnalysisRequest {
        pool,
        question: cli.question(),
    };

    let provider = if cli.mock {
        LlmProvider::Mock
    } else {
        LlmProvider::from_str(&config.llm.provider).map_err(KapacityError::config)?
    };

    let client = create_client(provider, config.llm.model.clone())?;
    let service = AdvisorService::new(client).with_max_tool_turns(cli.max_turns);

    let report = if cli.mock {
        info!("Running against in-memory mock telemetry");
        let runner = MockKustoClient::with_sample_telemetry();
        service.run(&request, &runner).await?
    } else {
        config.cluster.validate()?;
        let credential: Arc<dyn TokenProvider> = match StaticTokenProvider::from_env() {
            Some(provider) => Arc::new(provider),
            None => Arc::new(AzureCliTokenProvider::new()),
        };
        let executor = QueryExecutor::new(config.cluster.clone(), credential);
        service.run(&request, &executor).await?
    };

    print_report(&request, &report);
    Ok(())
}

fn print_report(request: &AnalysisRequest, report: &AdvisorReport) {
    println!("Pool: {}", request.pool);
    println!("Question: {}\n", request.question);

    for executed in &report.queries {
        let status = if executed.failed() { "FAILED" } else { "OK" };
        println!("[{}] {}", status, executed.name);
        for line in executed.query.lines() {
            println!("    {}", line);
        }
    }

    println!("\n--- Recommendation ---");
    println!("{}", report.recommendation);
}
