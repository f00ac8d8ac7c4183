//! Configuration management for Kapacity.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! CLI flags are merged on top by the caller, taking highest precedence.

use crate::error::{KapacityError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for Kapacity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target cluster settings.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration; a malformed file is
    /// an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            KapacityError::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            KapacityError::config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Returns the default config file path
    /// (`<config dir>/kapacity/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("kapacity")
            .join("config.toml")
    }
}

/// Target cluster and database.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClusterConfig {
    /// Cluster query endpoint, e.g. "https://pool.westus2.kusto.windows.net".
    #[serde(default)]
    pub endpoint: String,

    /// Database holding the telemetry table.
    #[serde(default)]
    pub database: String,

    /// Default compute pool to analyze when none is given on the CLI.
    #[serde(default)]
    pub pool: Option<String>,
}

impl ClusterConfig {
    /// Applies environment variable defaults for fields not already set.
    ///
    /// Reads `KUSTO_ENDPOINT` and `KUSTO_DATABASE`.
    pub fn apply_env_defaults(&mut self) {
        if self.endpoint.is_empty() {
            if let Ok(endpoint) = std::env::var("KUSTO_ENDPOINT") {
                self.endpoint = endpoint;
            }
        }
        if self.database.is_empty() {
            if let Ok(database) = std::env::var("KUSTO_DATABASE") {
                self.database = database;
            }
        }
    }

    /// Validates that the cluster is fully specified and the endpoint is a
    /// well-formed https URL.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(KapacityError::config(
                "no cluster endpoint configured (set [cluster].endpoint, KUSTO_ENDPOINT, or --cluster)",
            ));
        }

        let url = Url::parse(&self.endpoint)
            .map_err(|e| KapacityError::config(format!("invalid cluster endpoint: {}", e)))?;

        if url.scheme() != "https" {
            return Err(KapacityError::config(format!(
                "cluster endpoint must use https, got '{}'",
                url.scheme()
            )));
        }

        if self.database.is_empty() {
            return Err(KapacityError::config(
                "no database configured (set [cluster].database, KUSTO_DATABASE, or --database)",
            ));
        }

        Ok(())
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// LLM provider: "openai", "anthropic", or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name override; the provider default applies when unset.
    #[serde(default)]
    pub model: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_file_yields_default() {
        let config = Config::load_from_file(Path::new("/nonexistent/kapacity.toml")).unwrap();
        assert!(config.cluster.endpoint.is_empty());
        assert_eq!(config.llm.provider, "openai");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[cluster]
endpoint = "https://pool.westus2.kusto.windows.net"
database = "Telemetry"
pool = "batch-east"

[llm]
provider = "anthropic"
model = "claude-sonnet-4-20250514"
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();

        assert_eq!(
            config.cluster.endpoint,
            "https://pool.westus2.kusto.windows.net"
        );
        assert_eq!(config.cluster.database, "Telemetry");
        assert_eq!(config.cluster.pool.as_deref(), Some("batch-east"));
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(
            config.llm.model.as_deref(),
            Some("claude-sonnet-4-20250514")
        );
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();

        let result = Config::load_from_file(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let cluster = ClusterConfig::default();
        let err = cluster.validate().unwrap_err();
        assert!(err.to_string().contains("no cluster endpoint"));
    }

    #[test]
    fn test_validate_rejects_http() {
        let cluster = ClusterConfig {
            endpoint: "http://pool.kusto.windows.net".to_string(),
            database: "Telemetry".to_string(),
            pool: None,
        };
        let err = cluster.validate().unwrap_err();
        assert!(err.to_string().contains("must use https"));
    }

    #[test]
    fn test_validate_requires_database() {
        let cluster = ClusterConfig {
            endpoint: "https://pool.kusto.windows.net".to_string(),
            database: String::new(),
            pool: None,
        };
        let err = cluster.validate().unwrap_err();
        assert!(err.to_string().contains("no database configured"));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let cluster = ClusterConfig {
            endpoint: "https://pool.westus2.kusto.windows.net".to_string(),
            database: "Telemetry".to_string(),
            pool: Some("batch-east".to_string()),
        };
        assert!(cluster.validate().is_ok());
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("kapacity/config.toml"));
    }
}
