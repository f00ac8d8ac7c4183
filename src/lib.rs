//! Kapacity - an AI-assisted capacity advisor for compute pools backed by
//! Kusto telemetry.
//!
//! The core pipeline: model output → [`extract`] → validated KQL →
//! [`kusto`] executor → rendered tables → [`analysis`] functions driven by
//! the model's tool calls → a capacity recommendation.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod kusto;
pub mod llm;
