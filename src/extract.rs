//! Query extraction from model output.
//!
//! LLM responses arrive as free-form markdown that may contain zero, one, or
//! many KQL queries, fenced or not. This module pulls the candidates out,
//! cleans them, and validates them before they are allowed anywhere near the
//! cluster. Extraction is best-effort: it never fails the caller, it just
//! returns fewer (possibly zero) queries.

use std::collections::HashSet;

/// Table every valid query must reference.
pub const TELEMETRY_TABLE: &str = "LogExecutionClusterInfo";

/// Fence language tags treated as KQL. An untagged fence also qualifies.
const KQL_FENCE_TAGS: &[&str] = &["kql", "kusto"];

/// Operator keywords that may continue a candidate in the line-scanning
/// fallback. A line starting with `|` always continues.
const CONTINUATION_KEYWORDS: &[&str] = &[
    "where",
    "summarize",
    "extend",
    "project",
    "order",
    "sort",
    "take",
    "top",
    "limit",
    "join",
    "union",
    "let",
    "datatable",
];

/// Extracts validated KQL queries from free-form model output.
///
/// Fenced code blocks are the primary source; the line-scanning fallback only
/// runs when no fenced block survives validation. Results are deduplicated by
/// exact string equality, first-seen order preserved.
pub fn extract_queries(raw: &str) -> Vec<String> {
    let mut queries: Vec<String> = fenced_candidates(raw)
        .iter()
        .filter_map(|c| clean_query(c))
        .collect();

    if queries.is_empty() {
        queries = scanned_candidates(raw)
            .iter()
            .filter_map(|c| clean_query(c))
            .collect();
    }

    let mut seen = HashSet::new();
    queries.retain(|q| seen.insert(q.clone()));
    queries
}

/// Cleans and validates a candidate query.
///
/// Strips fence markers, trims lines, drops blanks and `//`/`#` comment
/// lines, and rejoins with `\n`. The result must reference
/// [`TELEMETRY_TABLE`] and either contain a pipe or be exactly the bare
/// table name; anything else is rejected.
pub fn clean_query(text: &str) -> Option<String> {
    let stripped = strip_fence_markers(text);

    let lines: Vec<&str> = stripped
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with('#'))
        .collect();

    if lines.is_empty() {
        return None;
    }

    let joined = lines.join("\n");

    if !joined.contains(TELEMETRY_TABLE) {
        return None;
    }

    if !joined.contains('|') && joined != TELEMETRY_TABLE {
        return None;
    }

    Some(joined)
}

/// Collects the bodies of KQL-tagged or untagged fenced code blocks.
///
/// Implemented as an explicit two-state line scanner (outside / in-block)
/// rather than a regex. Blocks tagged with another language are consumed but
/// not collected, and an unterminated fence yields no block.
fn fenced_candidates(raw: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    // Some((collect, body)): inside a block; `collect` is false for blocks
    // tagged with a non-KQL language.
    let mut block: Option<(bool, Vec<&str>)> = None;

    for line in raw.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("```") {
            match block.take() {
                Some((true, body)) => candidates.push(body.join("\n")),
                Some((false, _)) => {}
                None => {
                    let tag = rest.trim().to_ascii_lowercase();
                    let collect = tag.is_empty() || KQL_FENCE_TAGS.contains(&tag.as_str());
                    block = Some((collect, Vec::new()));
                }
            }
        } else if let Some((_, body)) = block.as_mut() {
            body.push(line);
        }
    }

    candidates
}

/// Line-scanning fallback for responses without fenced blocks.
///
/// A line beginning with the telemetry table name opens a candidate; lines
/// that start with a recognized operator keyword extend it; any other line
/// (or end of input) closes it.
fn scanned_candidates(raw: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(TELEMETRY_TABLE) {
            if let Some(body) = current.take() {
                candidates.push(body.join("\n"));
            }
            current = Some(vec![trimmed]);
        } else {
            match current.take() {
                Some(mut body) if continues_query(trimmed) => {
                    body.push(trimmed);
                    current = Some(body);
                }
                Some(body) => candidates.push(body.join("\n")),
                None => {}
            }
        }
    }

    if let Some(body) = current {
        candidates.push(body.join("\n"));
    }

    candidates
}

/// Returns true if a trimmed line extends the current fallback candidate.
fn continues_query(line: &str) -> bool {
    if line.starts_with('|') {
        return true;
    }
    let first = line.split_whitespace().next().unwrap_or("");
    CONTINUATION_KEYWORDS
        .iter()
        .any(|k| first.eq_ignore_ascii_case(k))
}

/// Removes KQL fence markers, case-insensitively.
fn strip_fence_markers(text: &str) -> String {
    let mut out = text.to_string();
    for tag in KQL_FENCE_TAGS {
        out = remove_ignore_ascii_case(&out, &format!("```{}", tag));
    }
    out.replace("```", "")
}

/// Removes every occurrence of an ASCII needle, ignoring ASCII case.
fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut out = String::with_capacity(haystack.len());
    let mut pos = 0;
    while let Some(found) = lower_haystack[pos..].find(&lower_needle) {
        out.push_str(&haystack[pos..pos + found]);
        pos += found + needle.len();
    }
    out.push_str(&haystack[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_single_fenced_query() {
        let response = r#"Here is a query for node counts:

```kql
LogExecutionClusterInfo
| where PoolName == "batch-east"
| summarize avg(NodeCount) by bin(TIMESTAMP, 1h)
```

This shows hourly averages."#;

        let queries = extract_queries(response);

        assert_eq!(queries.len(), 1);
        assert!(queries[0].starts_with(TELEMETRY_TABLE));
        assert!(queries[0].contains("summarize avg(NodeCount)"));
    }

    #[test]
    fn test_extract_multiple_fenced_queries() {
        let response = "```kql\nLogExecutionClusterInfo | take 10\n```\ntext\n```kusto\nLogExecutionClusterInfo | count\n```";

        let queries = extract_queries(response);

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], "LogExecutionClusterInfo | take 10");
        assert_eq!(queries[1], "LogExecutionClusterInfo | count");
    }

    #[test]
    fn test_extract_untagged_fence() {
        let response = "```\nLogExecutionClusterInfo | take 5\n```";
        let queries = extract_queries(response);
        assert_eq!(queries, vec!["LogExecutionClusterInfo | take 5"]);
    }

    #[test]
    fn test_fence_tag_case_insensitive() {
        let response = "```KQL\nLogExecutionClusterInfo | take 5\n```";
        let queries = extract_queries(response);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn test_other_language_fence_ignored() {
        let response = "```python\nprint('LogExecutionClusterInfo | take 5')\n```";
        let queries = extract_queries(response);
        assert!(queries.is_empty());
    }

    #[test]
    fn test_duplicate_fenced_blocks_deduplicated() {
        let response = "```kql\nLogExecutionClusterInfo | count\n```\n```kql\nLogExecutionClusterInfo | count\n```";
        let queries = extract_queries(response);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn test_fenced_block_suppresses_fallback() {
        // The bare query outside the fence would be picked up by the
        // fallback, but a valid fenced block must win outright.
        let response = "LogExecutionClusterInfo | where NodeCount > 5\n\n```kql\nLogExecutionClusterInfo | count\n```";
        let queries = extract_queries(response);
        assert_eq!(queries, vec!["LogExecutionClusterInfo | count"]);
    }

    #[test]
    fn test_fallback_line_scan_single_line() {
        let response = "Try this:\nLogExecutionClusterInfo | where PoolName == \"x\"\nThat should work.";
        let queries = extract_queries(response);
        assert_eq!(
            queries,
            vec!["LogExecutionClusterInfo | where PoolName == \"x\""]
        );
    }

    #[test]
    fn test_fallback_multiline_with_keywords() {
        let response = "LogExecutionClusterInfo\n| where NodeCount > 0\nsummarize count()\nAnd that is all.";
        let queries = extract_queries(response);
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0],
            "LogExecutionClusterInfo\n| where NodeCount > 0\nsummarize count()"
        );
    }

    #[test]
    fn test_fallback_keyword_case_insensitive() {
        let response = "LogExecutionClusterInfo\nWHERE NodeCount > 0\nTAKE 10";
        let queries = extract_queries(response);
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("WHERE NodeCount > 0"));
        assert!(queries[0].contains("TAKE 10"));
    }

    #[test]
    fn test_fallback_two_candidates() {
        let response =
            "LogExecutionClusterInfo | take 1\nunrelated prose\nLogExecutionClusterInfo | take 2";
        let queries = extract_queries(response);
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_no_queries_in_plain_text() {
        let queries = extract_queries("I cannot answer that without more context.");
        assert!(queries.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_queries("").is_empty());
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_line_scan() {
        let response = "```kql\nLogExecutionClusterInfo | take 5";
        let queries = extract_queries(response);
        // The dangling fence is not a block, so the fenced scanner yields
        // nothing and the fallback picks up the bare query line.
        assert_eq!(queries, vec!["LogExecutionClusterInfo | take 5"]);
    }

    #[test]
    fn test_clean_rejects_missing_table() {
        assert_eq!(clean_query("SomeOtherTable | count"), None);
    }

    #[test]
    fn test_clean_accepts_bare_table_name() {
        assert_eq!(
            clean_query("  LogExecutionClusterInfo  "),
            Some(TELEMETRY_TABLE.to_string())
        );
    }

    #[test]
    fn test_clean_rejects_extra_text_without_pipe() {
        assert_eq!(clean_query("LogExecutionClusterInfo take 10"), None);
    }

    #[test]
    fn test_clean_drops_comments_and_blanks() {
        let text = "// hourly node counts\nLogExecutionClusterInfo\n\n# another comment\n| take 10";
        assert_eq!(
            clean_query(text),
            Some("LogExecutionClusterInfo\n| take 10".to_string())
        );
    }

    #[test]
    fn test_clean_strips_embedded_fence_markers() {
        let text = "```kql\nLogExecutionClusterInfo | count\n```";
        assert_eq!(
            clean_query(text),
            Some("LogExecutionClusterInfo | count".to_string())
        );
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_query(""), None);
        assert_eq!(clean_query("   \n  \n"), None);
    }

    #[test]
    fn test_clean_comment_only_input() {
        assert_eq!(clean_query("// just a comment"), None);
    }

    #[test]
    fn test_remove_ignore_ascii_case() {
        assert_eq!(remove_ignore_ascii_case("```KQL\nx", "```kql"), "\nx");
        assert_eq!(remove_ignore_ascii_case("abc", "xyz"), "abc");
    }
}
