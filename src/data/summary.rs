use crate::data::dataset::Dataset;
use crate::data::value::Value;
use std::collections::HashMap;

/// A column is categorical when its distinct non-null values stay at or
/// below this count, or below the row-count ratio. Fixed so inference is
/// reproducible across runs.
pub const MAX_CATEGORICAL_DISTINCT: usize = 50;
pub const CATEGORICAL_RATIO: f64 = 0.2;

/// Number of most-frequent values reported per categorical column.
pub const TOP_VALUE_COUNT: usize = 5;

/// Date/time formats a column must match (every non-null cell) to be
/// inferred temporal. RFC 3339 is tried first, then these.
const TEMPORAL_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
    Text,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Text => "text",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CategoricalStats {
    pub distinct: usize,
    /// Top values by descending count, ties broken lexically.
    pub top: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub numeric: Option<NumericStats>,
    pub categorical: Option<CategoricalStats>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DateRange {
    pub column: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnSummary>,
    /// Span of the first temporal column, when one exists.
    pub date_range: Option<DateRange>,
}

impl Summary {
    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnSummary> {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &ColumnSummary> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
    }
}

/// Compute summary statistics for a dataset. Deterministic: identical
/// input yields identical output, including the order of top-value lists.
pub fn summarize(dataset: &Dataset) -> Summary {
    let columns: Vec<ColumnSummary> = dataset
        .columns()
        .iter()
        .map(|name| summarize_column(dataset, name))
        .collect();

    let date_range = columns
        .iter()
        .find(|c| c.kind == ColumnKind::Temporal)
        .and_then(|c| date_range_of(dataset, &c.name));

    Summary {
        row_count: dataset.len(),
        column_count: dataset.columns().len(),
        columns,
        date_range,
    }
}

fn summarize_column(dataset: &Dataset, name: &str) -> ColumnSummary {
    let cells: Vec<&Value> = dataset
        .column_values(name)
        .map(|it| it.collect())
        .unwrap_or_default();
    let non_null: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();

    let kind = infer_kind(&non_null, dataset.len());

    let numeric = if kind == ColumnKind::Numeric {
        let values: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
        numeric_stats(&values)
    } else {
        None
    };

    let categorical = if kind == ColumnKind::Categorical {
        Some(categorical_stats(&non_null))
    } else {
        None
    };

    ColumnSummary {
        name: name.to_string(),
        kind,
        non_null: non_null.len(),
        numeric,
        categorical,
    }
}

/// Inference policy: numeric if every non-null value parses as a number;
/// temporal if every non-null value matches a fixed date format; else
/// categorical when the distinct count is small (see the constants above);
/// otherwise free text. All-null columns are free text.
fn infer_kind(non_null: &[&Value], row_count: usize) -> ColumnKind {
    if non_null.is_empty() {
        return ColumnKind::Text;
    }

    if non_null.iter().all(|v| v.as_f64().is_some()) {
        return ColumnKind::Numeric;
    }

    if non_null.iter().all(|v| parse_temporal(&v.to_string()).is_some()) {
        return ColumnKind::Temporal;
    }

    let distinct = distinct_count(non_null);
    let ratio_limit = (row_count as f64 * CATEGORICAL_RATIO).floor() as usize;
    if distinct <= MAX_CATEGORICAL_DISTINCT || distinct <= ratio_limit {
        ColumnKind::Categorical
    } else {
        ColumnKind::Text
    }
}

fn distinct_count(values: &[&Value]) -> usize {
    let mut seen: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    seen.sort();
    seen.dedup();
    seen.len()
}

fn numeric_stats(values: &[f64]) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some(NumericStats {
        min,
        max,
        mean: sum / values.len() as f64,
    })
}

fn categorical_stats(non_null: &[&Value]) -> CategoricalStats {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in non_null {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let distinct = counts.len();

    let mut top: Vec<(String, usize)> = counts.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_VALUE_COUNT);

    CategoricalStats { distinct, top }
}

/// Parse a cell against the fixed temporal format list, returning a
/// sortable normalised timestamp string.
pub fn parse_temporal(text: &str) -> Option<String> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string());
    }
    for fmt in TEMPORAL_FORMATS {
        if fmt.contains("%H") {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(dt.format("%Y-%m-%d %H:%M:%S").to_string());
            }
        } else if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d.format("%Y-%m-%d 00:00:00").to_string());
        }
    }
    None
}

fn date_range_of(dataset: &Dataset, column: &str) -> Option<DateRange> {
    let mut timestamps: Vec<String> = dataset
        .column_values(column)?
        .filter(|v| !v.is_null())
        .filter_map(|v| parse_temporal(&v.to_string()))
        .collect();
    timestamps.sort();

    let start = timestamps.first()?.clone();
    let end = timestamps.last()?.clone();
    Some(DateRange {
        column: column.to_string(),
        start,
        end,
    })
}
