//! Ordering of table cells.
//!
//! Ergast sends lap and race times as text (`1:32.456`, `+20.524`), so cells
//! that look like durations sort as seconds rather than as strings.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?(?:(?:(\d+):)?(\d+):)?(\d+(?:\.\d+)?)s?$").unwrap());

/// Seconds in a duration such as `1:27:46.548`, `1:32.456` or `+20.524s`.
pub fn parse_duration(text: &str) -> Option<f64> {
    let caps = DURATION.captures(text.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    Some(part(1) * 3600.0 + part(2) * 60.0 + part(3))
}

/// How a cell takes part in ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Number(f64),
    Text(String),
    Missing,
}

impl SortKey {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => SortKey::Missing,
            Value::Number(n) => n.as_f64().map(SortKey::Number).unwrap_or(SortKey::Missing),
            Value::Bool(b) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
            Value::String(s) if s.trim().is_empty() => SortKey::Missing,
            Value::String(s) => match parse_duration(s) {
                Some(seconds) => SortKey::Number(seconds),
                None => SortKey::Text(s.to_lowercase()),
            },
            other => SortKey::Text(other.to_string()),
        }
    }
}

/// Compare two cells; numbers before text, missing values always last.
pub fn compare_cells(a: &Value, b: &Value, descending: bool) -> Ordering {
    let (a, b) = (SortKey::of(a), SortKey::of(b));
    let ordering = match (&a, &b) {
        (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
        (SortKey::Missing, _) => return Ordering::Greater,
        (_, SortKey::Missing) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
    };
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}
