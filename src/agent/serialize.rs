//! Turning tool results into conversation text.

use super::budget::TokenBudget;
use super::table::{Table, ToolOutput, PREVIEW_ROWS};
use crate::error::Result;

/// What an empty table serializes to, so "no rows" never looks like "no result".
pub const EMPTY_TABLE_MARKER: &str = "{}";

/// Text form of a tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedResult {
    pub text: String,
    /// Set when the payload was replaced by an overflow notice.
    pub deferred: bool,
}

/// Serialize a tool result deterministically.
pub fn serialize_output(output: &ToolOutput) -> Result<String> {
    match output {
        ToolOutput::Table(table) if table.is_empty() => Ok(EMPTY_TABLE_MARKER.to_string()),
        ToolOutput::Table(table) => Ok(serde_json::to_string(table)?),
        ToolOutput::Text(text) => Ok(text.clone()),
        ToolOutput::Value(value) => Ok(serde_json::to_string(value)?),
    }
}

/// Message sent in place of a table too large for the conversation.
pub fn overflow_notice(
    tool: &str,
    table: &Table,
    tokens: usize,
    budget: &TokenBudget,
    analysis_tools: &[&str],
) -> String {
    let (rows, cols) = table.shape();

    let mut notice = format!(
        "The result of `{}` is too large to include in the conversation ({} tokens, limit {}). \
        It is a table with {} rows and {} columns ({}).\n\n\
        First rows:\n{}\n\n\
        You cannot read this data directly. It is now held as the current dataset.",
        tool,
        tokens,
        budget.ceiling(),
        rows,
        cols,
        table.columns().join(", "),
        table.preview(PREVIEW_ROWS),
    );

    if !analysis_tools.is_empty() {
        let names = analysis_tools
            .iter()
            .map(|name| format!("`{}`", name))
            .collect::<Vec<_>>()
            .join(" or ");
        notice.push_str(&format!(
            " To answer the question, call {} with an instruction describing what to \
            compute from it.",
            names
        ));
    }

    notice
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_rows() -> Table {
        Table::from_columns(vec![
            ("position", vec![json!(1), json!(2)]),
            ("last_name", vec![json!("Leclerc"), json!("Sainz")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_table_marker() {
        let empty = ToolOutput::Table(Table::new(["position", "last_name"]));
        let text = serialize_output(&empty).unwrap();
        assert_eq!(text, EMPTY_TABLE_MARKER);
        assert!(!text.is_empty());
    }

    #[test]
    fn test_table_serialization_is_stable() {
        let output = ToolOutput::Table(two_rows());
        let first = serialize_output(&output).unwrap();
        let second = serialize_output(&output.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            r#"[{"position":1,"last_name":"Leclerc"},{"position":2,"last_name":"Sainz"}]"#
        );
    }

    #[test]
    fn test_structured_values_keep_key_order() {
        let output = ToolOutput::Value(json!({"zeta": 1, "alpha": [true, null]}));
        assert_eq!(serialize_output(&output).unwrap(), r#"{"zeta":1,"alpha":[true,null]}"#);
        assert_eq!(serialize_output(&output).unwrap(), serialize_output(&output.clone()).unwrap());

        let text = ToolOutput::Text("42".to_string());
        assert_eq!(serialize_output(&text).unwrap(), "42");
    }

    #[test]
    fn test_overflow_notice_names_tool_and_shape() {
        let budget = TokenBudget::new(10);
        let notice =
            overflow_notice("get_driver_information", &two_rows(), 900, &budget, &["analyze_data"]);

        assert!(notice.contains("`get_driver_information`"));
        assert!(notice.contains("2 rows and 2 columns"));
        assert!(notice.contains("1 | Leclerc"));
        assert!(notice.contains("call `analyze_data`"));
        assert!(!notice.contains(r#""last_name":"Sainz""#));
    }
}
