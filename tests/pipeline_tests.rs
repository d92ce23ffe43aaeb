use fieldfolio::client::Submission;
use fieldfolio::config::ReportConfig;
use fieldfolio::data::{self, Value};
use fieldfolio::report::{self, ChartKind, ChartSpec};
use pretty_assertions::assert_eq;
use serde_json::json;

fn submission(value: serde_json::Value) -> Submission {
    match value {
        serde_json::Value::Object(map) => Submission::new(map),
        _ => panic!("submissions are objects"),
    }
}

fn survey_dataset() -> data::Dataset {
    let submissions: Vec<Submission> = (0..45)
        .map(|i| {
            submission(json!({
                "__id": format!("uuid:{}", i),
                "respondent": {"age": 18 + (i % 40), "consent": if i % 3 == 0 { "no" } else { "yes" }},
                "score": (i as f64) * 1.5,
                "submitted_at": format!("2024-05-{:02}", 1 + (i % 28)),
            }))
        })
        .collect();
    data::flatten(&submissions)
}

#[test]
fn test_flatten_produces_dot_path_columns() {
    let ds = survey_dataset();
    assert_eq!(
        ds.columns(),
        &[
            "__id",
            "respondent.age",
            "respondent.consent",
            "score",
            "submitted_at"
        ]
    );
    assert_eq!(ds.len(), 45);
}

#[test]
fn test_csv_round_trip_preserves_order_and_stringified_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.csv");

    let ds = survey_dataset();
    data::export::write(&ds, &path, data::ExportFormat::Csv).unwrap();
    let loaded = data::import::load(&path).unwrap();

    assert_eq!(loaded.columns(), ds.columns());
    assert_eq!(loaded.len(), ds.len());

    // CSV stringifies cells; compare through the display form.
    for (row, loaded_row) in ds.rows().iter().zip(loaded.rows()) {
        let original: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let reloaded: Vec<String> = loaded_row.iter().map(|v| v.to_string()).collect();
        assert_eq!(original, reloaded);
    }
}

#[test]
fn test_json_round_trip_preserves_cell_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.json");

    let ds = survey_dataset();
    data::export::write(&ds, &path, data::ExportFormat::Json).unwrap();
    let loaded = data::import::load(&path).unwrap();

    assert_eq!(loaded.columns(), ds.columns());
    assert_eq!(loaded.rows()[0], ds.rows()[0]);
    assert_eq!(loaded.rows()[44], ds.rows()[44]);
}

#[test]
fn test_null_cells_export_as_empty_and_reload_as_null() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sparse.csv");

    let subs = vec![
        submission(json!({"a": 1, "b": "x"})),
        submission(json!({"a": 2})),
    ];
    let ds = data::flatten(&subs);
    data::export::write(&ds, &path, data::ExportFormat::Csv).unwrap();

    let loaded = data::import::load(&path).unwrap();
    assert_eq!(loaded.rows()[1][1], Value::Null);
}

#[test]
fn test_summary_of_loaded_csv_recovers_column_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.csv");

    let ds = survey_dataset();
    data::export::write(&ds, &path, data::ExportFormat::Csv).unwrap();
    let loaded = data::import::load(&path).unwrap();
    let summary = data::summarize(&loaded);

    let kind_of = |name: &str| {
        summary
            .columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
            .unwrap()
    };
    assert_eq!(kind_of("respondent.age"), data::ColumnKind::Numeric);
    assert_eq!(kind_of("respondent.consent"), data::ColumnKind::Categorical);
    assert_eq!(kind_of("submitted_at"), data::ColumnKind::Temporal);

    let range = summary.date_range.as_ref().unwrap();
    assert_eq!(range.column, "submitted_at");
    assert_eq!(range.start, "2024-05-01 00:00:00");
}

#[test]
fn test_full_pipeline_writes_report_with_partial_chart_failure() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("survey.csv");
    let pdf_path = dir.path().join("survey_report.pdf");

    let ds = survey_dataset();
    data::export::write(&ds, &csv_path, data::ExportFormat::Csv).unwrap();

    let loaded = data::import::load(&csv_path).unwrap();
    let summary = data::summarize(&loaded);

    let config = ReportConfig {
        title: "Household Survey".to_string(),
        max_table_rows: 20,
        charts: vec![
            ChartSpec {
                kind: ChartKind::Bar,
                x: "respondent.consent".to_string(),
                y: None,
                title: "Consent".to_string(),
            },
            ChartSpec {
                kind: ChartKind::Histogram,
                x: "respondent.age".to_string(),
                y: None,
                title: "Ages".to_string(),
            },
            ChartSpec {
                kind: ChartKind::Bar,
                x: "no_such_column".to_string(),
                y: None,
                title: "Broken".to_string(),
            },
        ],
        ..ReportConfig::default()
    };

    let outcome = report::generate(&loaded, &summary, &config, &pdf_path).unwrap();
    assert_eq!(outcome.charts_rendered, 2);
    assert_eq!(outcome.chart_warnings.len(), 1);
    assert!(outcome.chart_warnings[0].contains("no_such_column"));
    // 45 rows at 20 per table page forces at least three pages.
    assert!(outcome.pages >= 3);

    let bytes = std::fs::read(&pdf_path).unwrap();
    assert_eq!(&bytes[..5], b"%PDF-");
}

#[test]
fn test_excel_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.xlsx");

    let subs = vec![
        submission(json!({"name": "ada", "age": 36, "score": 9.5})),
        submission(json!({"name": "grace", "age": 45, "score": 8.0})),
    ];
    let ds = data::flatten(&subs);
    data::export::write(&ds, &path, data::ExportFormat::Excel).unwrap();

    let loaded = data::import::load(&path).unwrap();
    assert_eq!(loaded.columns(), ds.columns());
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.rows()[0][0], Value::Str("ada".to_string()));
    // Spreadsheet numbers come back as floats.
    assert_eq!(loaded.rows()[0][1].as_f64(), Some(36.0));
    assert_eq!(loaded.rows()[1][2].as_f64(), Some(8.0));
}

#[test]
fn test_auto_chart_selection_from_summary() {
    let ds = survey_dataset();
    let summary = data::summarize(&ds);
    let specs = report::default_charts(&summary);

    assert!(!specs.is_empty());
    assert!(specs
        .iter()
        .any(|s| s.kind == ChartKind::Bar && s.x == "respondent.consent"));
    assert!(specs
        .iter()
        .any(|s| s.kind == ChartKind::Histogram));
}
