//! Error types for Kapacity.
//!
//! Defines the error enum used by the orchestration layer. The analysis
//! pipeline itself (extractor, executor rendering, analysis functions)
//! communicates failure through sentinel strings instead, so this type never
//! crosses those boundaries.

use thiserror::Error;

/// Main error type for Kapacity operations.
#[derive(Error, Debug)]
pub enum KapacityError {
    /// Cluster connection errors (endpoint unreachable, auth failed, etc.)
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Query execution errors reported by the query engine.
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KapacityError {
    /// Creates a cluster error with the given message.
    pub fn cluster(msg: impl Into<String>) -> Self {
        Self::Cluster(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Cluster(_) => "Cluster Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using KapacityError.
pub type Result<T> = std::result::Result<T, KapacityError>;
