//! Command-line argument parsing for Kapacity.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Question used when the operator gives none.
const DEFAULT_QUESTION: &str =
    "Assess the pool's current capacity and recommend whether to scale up, down, or hold.";

/// An AI-assisted capacity advisor for compute pools backed by Kusto telemetry.
#[derive(Parser, Debug)]
#[command(name = "kapacity")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Capacity question for the advisor (free text)
    #[arg(value_name = "QUESTION", trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Cluster query endpoint (e.g. https://pool.westus2.kusto.windows.net)
    #[arg(short = 'c', long, value_name = "URL", env = "KUSTO_ENDPOINT")]
    pub cluster: Option<String>,

    /// Database holding the telemetry table
    #[arg(short = 'd', long, value_name = "NAME", env = "KUSTO_DATABASE")]
    pub database: Option<String>,

    /// Compute pool to analyze
    #[arg(short = 'p', long, value_name = "NAME")]
    pub pool: Option<String>,

    /// LLM provider (openai, anthropic, mock)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model name override
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run against in-memory mock data with the mock LLM (no cluster, no API key)
    #[arg(long)]
    pub mock: bool,

    /// Maximum analysis tool rounds before the model must answer
    #[arg(long, value_name = "N", default_value = "8")]
    pub max_turns: usize,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the operator's question, or the default one.
    pub fn question(&self) -> String {
        if self.question.is_empty() {
            DEFAULT_QUESTION.to_string()
        } else {
            self.question.join(" ")
        }
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Merges CLI overrides into a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(cluster) = &self.cluster {
            config.cluster.endpoint = cluster.clone();
        }
        if let Some(database) = &self.database {
            config.cluster.database = database.clone();
        }
        if let Some(pool) = &self.pool {
            config.cluster.pool = Some(pool.clone());
        }
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
    }
}
