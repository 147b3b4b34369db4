//! The `analyze_data` tool: operates on the dataset the last fetch produced.
//!
//! The model cannot see an oversized table, so it narrows it here instead:
//! filter, sort, limit and column selection, or a bar chart saved as an
//! artifact next to the answer.

mod chart;
mod sort;

pub use chart::{bar_chart_svg, BarChart};
pub use sort::{compare_cells, parse_duration, SortKey};

use crate::agent::{
    display_cell, typed_arguments, AnalysisContext, AnalysisTool, Table, ToolOutput, ToolSpec,
};
use crate::charts::{list_charts, CHART_EXTENSION};
use crate::error::{F1Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const ANALYZE_DATA: &str = "analyze_data";

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    instruction: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    filter_column: String,
    #[serde(default)]
    filter_value: String,
    #[serde(default)]
    sort_by: String,
    #[serde(default)]
    descending: bool,
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    chart_column: String,
    #[serde(default)]
    label_column: String,
}

/// Deterministic table analyst over the current dataset.
#[derive(Debug, Default, Clone)]
pub struct AnalyzeData;

impl AnalyzeData {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: AnalyzeArgs, ctx: AnalysisContext<'_>) -> Result<ToolOutput> {
        let data = ctx.data;
        debug!("Analyzing {:?} table: {}", data.shape(), args.instruction);

        let mut table = if args.filter_column.is_empty() {
            data.clone()
        } else {
            let idx = column(data, &args.filter_column)?;
            let wanted = args.filter_value.trim().to_lowercase();
            data.filter_rows(|row| display_cell(&row[idx]).to_lowercase() == wanted)
        };

        if !args.sort_by.is_empty() {
            let idx = column(&table, &args.sort_by)?;
            let descending = args.descending;
            table.sort_rows_by(|a, b| compare_cells(&a[idx], &b[idx], descending));
        }

        if args.limit > 0 {
            table.truncate(args.limit as usize);
        }

        if !args.chart_column.is_empty() {
            return self.chart(&table, &args, ctx);
        }

        let table = table.select(&args.columns).map_err(invalid)?;
        info!("{} produced {:?} table", ANALYZE_DATA, table.shape());
        Ok(table.into())
    }

    fn chart(
        &self,
        table: &Table,
        args: &AnalyzeArgs,
        ctx: AnalysisContext<'_>,
    ) -> Result<ToolOutput> {
        let dir = ctx.chart_dir.ok_or_else(|| {
            F1Error::Analysis("charts are not enabled for this conversation".to_string())
        })?;

        let value_idx = column(table, &args.chart_column)?;
        let label_idx = if args.label_column.is_empty() {
            None
        } else {
            Some(column(table, &args.label_column)?)
        };

        let mut chart = BarChart::new(&args.instruction, &args.chart_column);
        for (i, row) in table.rows().iter().enumerate() {
            let label = match label_idx {
                Some(idx) => display_cell(&row[idx]),
                None => (i + 1).to_string(),
            };
            match SortKey::of(&row[value_idx]) {
                SortKey::Number(value) => chart.push(label, value),
                SortKey::Missing => continue,
                SortKey::Text(text) => {
                    return Err(F1Error::Analysis(format!(
                        "column '{}' is not numeric (found '{}')",
                        args.chart_column, text
                    )))
                }
            }
        }
        if chart.is_empty() {
            return Err(F1Error::Analysis(format!(
                "no values to chart in column '{}'",
                args.chart_column
            )));
        }

        std::fs::create_dir_all(dir)?;
        let index = list_charts(dir)?.len() + 1;
        let path = dir.join(format!("chart-{}.{}", index, CHART_EXTENSION));
        std::fs::write(&path, bar_chart_svg(&chart))?;
        info!("Saved chart {:?}", path);

        Ok(ToolOutput::Text(format!(
            "Saved a bar chart of '{}' with {} bars. It is shown to the user below your answer.",
            args.chart_column,
            chart.len()
        )))
    }
}

#[async_trait]
impl AnalysisTool for AnalyzeData {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(ANALYZE_DATA)
            .doc(
                "Work on the most recently fetched dataset without fetching it again. \
                 Use this when a result was too large to return. Rows can be filtered \
                 on one column, sorted, limited and reduced to some columns. Setting \
                 chart_column draws a bar chart of that numeric column instead.",
            )
            .param::<String>("instruction", "What you want to find out from the data")
            .optional("columns", "Columns to return; empty means all", Vec::<String>::new())
            .optional("filter_column", "Column to filter on", String::new())
            .optional(
                "filter_value",
                "Keep rows whose filter_column equals this value",
                String::new(),
            )
            .optional("sort_by", "Column to sort by", String::new())
            .optional("descending", "Sort from largest to smallest", false)
            .optional("limit", "Maximum rows to keep; 0 means no limit", 0_i64)
            .optional("chart_column", "Numeric column to draw as a bar chart", String::new())
            .optional("label_column", "Column used to label the chart bars", String::new())
    }

    async fn analyze(
        &self,
        args: Map<String, Value>,
        ctx: AnalysisContext<'_>,
    ) -> Result<ToolOutput> {
        let args: AnalyzeArgs = typed_arguments(ANALYZE_DATA, args)?;
        self.run(args, ctx)
    }
}

fn column(table: &Table, name: &str) -> Result<usize> {
    table.column_index(name).ok_or_else(|| {
        invalid(format!(
            "unknown column '{}', available columns: {}",
            name,
            table.columns().join(", ")
        ))
    })
}

fn invalid(message: String) -> F1Error {
    F1Error::InvalidArguments {
        tool: ANALYZE_DATA.to_string(),
        message,
    }
}
