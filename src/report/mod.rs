pub mod chart;
pub mod pdf;

pub use pdf::{generate, ReportOutcome};

use crate::data::{ColumnKind, Summary};
use crate::{FieldfolioError, Result};
use serde::{Deserialize, Serialize};

/// Declarative description of one chart: type, column(s), title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Histogram,
    Scatter,
    Line,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Histogram => "histogram",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
        };
        write!(f, "{}", s)
    }
}

impl ChartSpec {
    /// Shape validation, run at configuration load time: scatter and
    /// line need both axes, everything else only x.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            ChartKind::Scatter | ChartKind::Line if self.y.is_none() => {
                Err(FieldfolioError::Config(format!(
                    "{} chart '{}' requires both x and y columns",
                    self.kind,
                    self.label()
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.x
        } else {
            &self.title
        }
    }
}

/// Upper bound on distinct values for an auto-selected bar chart.
const AUTO_CHART_MAX_CATEGORIES: usize = 20;
const AUTO_CHART_MAX_CATEGORICAL: usize = 3;
const AUTO_CHART_MAX_NUMERIC: usize = 2;

/// When the configuration declares no charts, pick sensible defaults
/// from the summary: bar charts for small categorical columns and
/// histograms for numeric columns.
pub fn default_charts(summary: &Summary) -> Vec<ChartSpec> {
    let mut specs = Vec::new();

    for col in summary
        .columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Categorical)
        .filter(|c| {
            c.categorical
                .as_ref()
                .map(|s| s.distinct <= AUTO_CHART_MAX_CATEGORIES)
                .unwrap_or(false)
        })
        .take(AUTO_CHART_MAX_CATEGORICAL)
    {
        specs.push(ChartSpec {
            kind: ChartKind::Bar,
            x: col.name.clone(),
            y: None,
            title: format!("Distribution of {}", col.name),
        });
    }

    for col in summary
        .columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .take(AUTO_CHART_MAX_NUMERIC)
    {
        specs.push(ChartSpec {
            kind: ChartKind::Histogram,
            x: col.name.clone(),
            y: None,
            title: format!("Distribution of {}", col.name),
        });
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;
    use crate::data::{summarize, Value};

    #[test]
    fn test_scatter_without_y_fails_validation() {
        let spec = ChartSpec {
            kind: ChartKind::Scatter,
            x: "a".to_string(),
            y: None,
            title: String::new(),
        };
        assert!(matches!(spec.validate(), Err(FieldfolioError::Config(_))));

        let spec = ChartSpec {
            kind: ChartKind::Scatter,
            x: "a".to_string(),
            y: Some("b".to_string()),
            title: String::new(),
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_bar_without_y_is_valid() {
        let spec = ChartSpec {
            kind: ChartKind::Bar,
            x: "status".to_string(),
            y: None,
            title: String::new(),
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_chart_spec_yaml_shape() {
        let yaml = "type: pie\nx: category\ntitle: Categories\n";
        let spec: ChartSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.kind, ChartKind::Pie);
        assert_eq!(spec.x, "category");
        assert_eq!(spec.y, None);
    }

    #[test]
    fn test_default_charts_pick_categorical_and_numeric() {
        let rows = vec![
            vec![Value::Str("yes".into()), Value::Int(1)],
            vec![Value::Str("no".into()), Value::Int(2)],
            vec![Value::Str("yes".into()), Value::Int(3)],
        ];
        let ds = Dataset::new(vec!["consent".into(), "age".into()], rows);
        let summary = summarize(&ds);

        let specs = default_charts(&summary);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].kind, ChartKind::Bar);
        assert_eq!(specs[0].x, "consent");
        assert_eq!(specs[1].kind, ChartKind::Histogram);
        assert_eq!(specs[1].x, "age");
    }
}
