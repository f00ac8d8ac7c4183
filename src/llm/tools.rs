//! Tool definitions for the analysis loop.
//!
//! Exposes the five tabular analysis functions to the model as callable
//! tools. The definitions are provider-agnostic; each client maps them onto
//! its native function-calling shape.

use serde::{Deserialize, Serialize};

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Input for tools addressing one query result by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryNameInput {
    pub query_name: String,
}

/// Input for tools addressing one column of one query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInput {
    pub query_name: String,
    pub column_name: String,
}

/// Input for the data-existence validation tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateInput {
    pub query_name: String,
    /// Comma-separated column names the caller expects to be present.
    pub expected_columns: String,
}

/// Returns the tool definitions available to the analysis loop.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let query_name_schema = serde_json::json!({
        "type": "object",
        "properties": {
            "query_name": {
                "type": "string",
                "description": "Result name, e.g. \"Query_1\""
            }
        },
        "required": ["query_name"]
    });

    let column_schema = serde_json::json!({
        "type": "object",
        "properties": {
            "query_name": {
                "type": "string",
                "description": "Result name, e.g. \"Query_1\""
            },
            "column_name": {
                "type": "string",
                "description": "Exact column name from the result header"
            }
        },
        "required": ["query_name", "column_name"]
    });

    vec![
        ToolDefinition {
            name: "get_available_queries".to_string(),
            description: "List every executed query with its status (SUCCESS or FAILED), row \
                          and column counts, header, and a sample row. Call this first to see \
                          what data is available."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_query_results".to_string(),
            description: "Return the full rendered result table (tab-delimited, header first) \
                          for one query."
                .to_string(),
            parameters: query_name_schema,
        },
        ToolDefinition {
            name: "extract_numeric_values".to_string(),
            description: "Return the raw values of one column as a comma-separated list."
                .to_string(),
            parameters: column_schema.clone(),
        },
        ToolDefinition {
            name: "calculate_statistics".to_string(),
            description: "Compute count, average, min, max, sum, and the 95th percentile for a \
                          numeric column. Returns a JSON record."
                .to_string(),
            parameters: column_schema,
        },
        ToolDefinition {
            name: "validate_data_existence".to_string(),
            description: "Check that a query result contains the expected columns and at least \
                          one data row. Returns a JSON record with a pass flag."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query_name": {
                        "type": "string",
                        "description": "Result name, e.g. \"Query_1\""
                    },
                    "expected_columns": {
                        "type": "string",
                        "description": "Comma-separated column names that must be present"
                    }
                },
                "required": ["query_name", "expected_columns"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions_complete() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "get_available_queries",
                "get_query_results",
                "extract_numeric_values",
                "calculate_statistics",
                "validate_data_existence",
            ]
        );
    }

    #[test]
    fn test_tool_schemas_are_objects() {
        for tool in tool_definitions() {
            assert_eq!(tool.parameters["type"], "object", "tool {}", tool.name);
        }
    }

    #[test]
    fn test_column_input_deserializes() {
        let input: ColumnInput =
            serde_json::from_str(r#"{"query_name":"Query_1","column_name":"NodeCount"}"#).unwrap();
        assert_eq!(input.query_name, "Query_1");
        assert_eq!(input.column_name, "NodeCount");
    }
}
