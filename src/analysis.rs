//! Tabular analysis functions.
//!
//! These are the deterministic functions the model calls while reasoning
//! over executed query results. Each takes rendered table text (tab/newline
//! delimited, as produced by the executor) or the named-results mapping, and
//! each is total: bad input produces a descriptive sentinel string or a
//! structured record with failure fields, never a panic or an error.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::kusto::{EXECUTION_ERROR_PREFIX, TRUNCATION_MARKER};

/// Message returned when the results mapping is empty.
pub const NO_RESULTS_MSG: &str = "No query results available.";

/// Message returned for empty or failed table text.
pub const NO_VALID_DATA_MSG: &str = "No valid data available for analysis.";

/// Message returned when a table has a header but no data rows.
pub const INSUFFICIENT_DATA_MSG: &str = "Insufficient data: query returned no data rows.";

/// Maximum number of raw values included in a statistics preview.
const SAMPLE_PREVIEW_LIMIT: usize = 10;

/// Executed query results, keyed by name, in execution order.
///
/// Owned by the orchestration layer and passed by reference to the analysis
/// functions, which never mutate it.
#[derive(Debug, Clone, Default)]
pub struct NamedResults {
    entries: Vec<(String, String)>,
}

impl NamedResults {
    /// Creates an empty results mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result under the given name.
    pub fn insert(&mut self, name: impl Into<String>, table_text: impl Into<String>) {
        self.entries.push((name.into(), table_text.into()));
    }

    /// Looks up a result by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    /// Returns the number of stored results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no results are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summary statistics for one numeric column, serialized for the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub sum: f64,
    pub percentile_95: f64,
    /// Preview of the first raw values, ellipsized when more exist.
    pub sample_values: String,
}

/// Outcome of checking a result for expected columns and data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataValidation {
    pub query_name: String,
    pub expected_columns: Vec<String>,
    pub actual_columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub data_row_count: usize,
    pub passed: bool,
}

/// Returns the stored table text for a query, or a not-found message.
pub fn get_query_results(results: &NamedResults, name: &str) -> String {
    results
        .get(name)
        .map(str::to_string)
        .unwrap_or_else(|| not_found_message(name))
}

/// Extracts one column's raw cell strings, joined with `", "`.
///
/// Sentinels: [`NO_VALID_DATA_MSG`] for empty or failed input,
/// [`INSUFFICIENT_DATA_MSG`] for a header-only table, and a message naming
/// the available columns when the requested one is absent. Rows containing
/// the truncation marker are skipped.
pub fn extract_numeric_values(table_text: &str, column_name: &str) -> String {
    if table_text.trim().is_empty() || table_text.starts_with(EXECUTION_ERROR_PREFIX) {
        return NO_VALID_DATA_MSG.to_string();
    }

    let lines: Vec<&str> = table_text.lines().collect();
    if lines.len() < 2 {
        return INSUFFICIENT_DATA_MSG.to_string();
    }

    let headers: Vec<&str> = lines[0].split('\t').collect();
    let Some(index) = headers.iter().position(|h| *h == column_name) else {
        return column_not_found_message(column_name, &headers);
    };

    let values: Vec<&str> = lines[1..]
        .iter()
        .filter(|line| !line.contains(TRUNCATION_MARKER))
        .filter_map(|line| line.split('\t').nth(index))
        .collect();

    values.join(", ")
}

/// Computes summary statistics over one column of a rendered table.
///
/// Extraction sentinels pass through unchanged. Cells that do not parse as
/// decimal numbers are silently discarded; if none survive, a no-numeric
/// sentinel is returned. Otherwise the statistics are serialized as JSON.
pub fn calculate_statistics(table_text: &str, column_name: &str) -> String {
    let extracted = extract_numeric_values(table_text, column_name);
    if is_extraction_sentinel(&extracted) {
        return extracted;
    }

    let values: Vec<f64> = extracted
        .split(',')
        .map(str::trim)
        .filter_map(|v| v.parse().ok())
        .collect();

    if values.is_empty() {
        return format!("No numeric values found in column '{}'.", column_name);
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let average = sum / count as f64;
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    // Nearest-rank with floor(count * 0.95); the out-of-bounds guard falls
    // back to zero. Downstream consumers depend on these exact values, so
    // this stays as-is rather than switching to interpolation.
    let p95_index = (count as f64 * 0.95).floor() as usize;
    let percentile_95 = sorted.get(p95_index).copied().unwrap_or_default();

    let mut sample_values = values
        .iter()
        .take(SAMPLE_PREVIEW_LIMIT)
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > SAMPLE_PREVIEW_LIMIT {
        sample_values.push_str(", ...");
    }

    let stats = ColumnStatistics {
        column: column_name.to_string(),
        count,
        average: round2(average),
        minimum: round2(minimum),
        maximum: round2(maximum),
        sum: round2(sum),
        percentile_95: round2(percentile_95),
        sample_values,
    };

    serde_json::to_string_pretty(&stats)
        .unwrap_or_else(|e| format!("Failed to serialize statistics: {}", e))
}

/// Summarizes every stored result for the model.
///
/// Each entry is classified FAILED (error-prefixed text) or SUCCESS with row
/// count, column count, the literal header line, and the first data row as a
/// sample; entries are separated by a blank line.
pub fn get_available_queries(results: &NamedResults) -> String {
    if results.is_empty() {
        return NO_RESULTS_MSG.to_string();
    }

    let mut sections = Vec::with_capacity(results.len());

    for (name, table_text) in results.iter() {
        if table_text.starts_with(EXECUTION_ERROR_PREFIX) {
            sections.push(format!("{}: FAILED\n  {}", name, table_text));
            continue;
        }

        let lines: Vec<&str> = table_text.lines().collect();
        let header = lines.first().copied().unwrap_or("");
        let column_count = header.split('\t').count();
        let row_count = lines.len().saturating_sub(1);

        let mut section = format!(
            "{}: SUCCESS\n  Rows: {} | Columns: {}\n  Header: {}",
            name, row_count, column_count, header
        );
        match lines.get(1) {
            Some(sample) => section.push_str(&format!("\n  Sample: {}", sample)),
            None => section.push_str("\n  Warning: query returned no data rows"),
        }
        sections.push(section);
    }

    sections.join("\n\n")
}

/// Checks a stored result for expected columns and at least one data row.
///
/// Returns a message for an unknown name or a failed query; otherwise a JSON
/// [`DataValidation`] record. `passed` is true only when no expected column
/// is missing and at least one data row exists.
pub fn validate_data_existence(
    results: &NamedResults,
    name: &str,
    expected_columns_csv: &str,
) -> String {
    let Some(table_text) = results.get(name) else {
        return not_found_message(name);
    };

    if table_text.starts_with(EXECUTION_ERROR_PREFIX) {
        return format!("Query '{}' failed: {}", name, table_text);
    }

    let lines: Vec<&str> = table_text.lines().collect();
    let actual_columns: Vec<String> = lines
        .first()
        .map(|h| h.split('\t').map(str::to_string).collect())
        .unwrap_or_default();

    let expected_columns: Vec<String> = expected_columns_csv
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let missing_columns: Vec<String> = expected_columns
        .iter()
        .filter(|c| !actual_columns.contains(c))
        .cloned()
        .collect();

    let data_row_count = lines.len().saturating_sub(1);

    let validation = DataValidation {
        query_name: name.to_string(),
        passed: missing_columns.is_empty() && data_row_count > 0,
        expected_columns,
        actual_columns,
        missing_columns,
        data_row_count,
    };

    serde_json::to_string_pretty(&validation)
        .unwrap_or_else(|e| format!("Failed to serialize validation: {}", e))
}

/// Rounds to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn not_found_message(name: &str) -> String {
    format!("No results found for query '{}'.", name)
}

fn column_not_found_message(column_name: &str, available: &[&str]) -> String {
    format!(
        "Column '{}' not found. Available columns: {}",
        column_name,
        available.join(", ")
    )
}

/// True if `text` is one of the sentinels [`extract_numeric_values`] emits.
fn is_extraction_sentinel(text: &str) -> bool {
    text == NO_VALID_DATA_MSG || text == INSUFFICIENT_DATA_MSG || text.starts_with("Column '")
}
