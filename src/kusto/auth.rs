//! Credential acquisition for the Kusto endpoint.
//!
//! Token acquisition is an external collaborator from the pipeline's point
//! of view: the executor only needs something that can produce a bearer
//! token for the cluster resource. The default provider shells out to the
//! Azure CLI so the operator's interactive login is reused.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{KapacityError, Result};

/// Environment variable holding a pre-acquired access token.
pub const ACCESS_TOKEN_ENV: &str = "KUSTO_ACCESS_TOKEN";

/// Source of bearer tokens for a cluster resource.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the given resource URI.
    async fn bearer_token(&self, resource: &str) -> Result<String>;
}

/// Token provider backed by the Azure CLI (`az account get-access-token`).
///
/// Relies on the operator having run `az login`; no credentials are stored
/// by this tool.
#[derive(Debug, Clone, Default)]
pub struct AzureCliTokenProvider;

impl AzureCliTokenProvider {
    /// Creates a new Azure CLI token provider.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct CliTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[async_trait]
impl TokenProvider for AzureCliTokenProvider {
    async fn bearer_token(&self, resource: &str) -> Result<String> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| {
                KapacityError::cluster(format!(
                    "failed to invoke the Azure CLI (is `az` installed?): {}",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KapacityError::cluster(format!(
                "Azure CLI token acquisition failed (run `az login`?): {}",
                stderr.trim()
            )));
        }

        let response: CliTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| KapacityError::cluster(format!("unexpected Azure CLI output: {}", e)))?;

        Ok(response.access_token)
    }
}

/// Token provider that returns a fixed token.
///
/// Used when the operator supplies a token out of band (CI, tests) via
/// [`ACCESS_TOKEN_ENV`].
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider around an already-acquired token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Creates a provider from [`ACCESS_TOKEN_ENV`], if set.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV).ok().map(Self::new)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self, _resource: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}
