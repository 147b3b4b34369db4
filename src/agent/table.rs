//! Tabular tool results.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Number of rows shown in a preview.
pub const PREVIEW_ROWS: usize = 5;

/// A dataset with named columns and rows of JSON scalar cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> Result<Self, String> {
        let height = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != height) {
            return Err(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                height
            ));
        }

        let mut table = Table::new(columns.iter().map(|(name, _)| *name));
        let mut iters: Vec<_> = columns.into_iter().map(|(_, v)| v.into_iter()).collect();
        for _ in 0..height {
            let row = iters.iter_mut().filter_map(Iterator::next).collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Append a row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// A table with no rows counts as empty, whatever its columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Keep only the named columns, in the order given.
    ///
    /// An empty selection keeps every column.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, String> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref()).ok_or_else(|| {
                    format!(
                        "unknown column '{}', available columns: {}",
                        name.as_ref(),
                        self.columns.join(", ")
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Keep rows matching the predicate.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Value]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Sort rows in place with the given comparator.
    pub fn sort_rows_by(
        &mut self,
        compare: impl FnMut(&Vec<Value>, &Vec<Value>) -> std::cmp::Ordering,
    ) {
        self.rows.sort_by(compare);
    }

    /// Keep at most `n` rows.
    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Text rendering of the first `n` rows.
    pub fn preview(&self, n: usize) -> String {
        let mut lines = vec![self.columns.join(" | ")];
        for row in self.rows.iter().take(n) {
            lines.push(row.iter().map(display_cell).collect::<Vec<_>>().join(" | "));
        }
        if self.rows.len() > n {
            lines.push(format!("... ({} more rows)", self.rows.len() - n));
        }
        lines.join("\n")
    }
}

/// Render a cell the way a person would read it.
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview(self.rows.len()))
    }
}

/// Tables serialize as a list of records, keys in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                columns: &self.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

/// What a tool hands back to the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Table(Table),
    Text(String),
    Value(Value),
}

impl ToolOutput {
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            ToolOutput::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<Table> for ToolOutput {
    fn from(table: Table) -> Self {
        ToolOutput::Table(table)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Value(value)
    }
}
