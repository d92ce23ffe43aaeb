use crate::client::Submission;
use crate::data::dataset::{flatten, Dataset};
use crate::data::export::ExportFormat;
use crate::data::value::Value;
use crate::{FieldfolioError, Result};
use std::path::Path;

/// Load a tabular file, inferring the format from its extension.
///
/// CSV cells load as strings (empty cells become nulls) — numeric typing
/// is recovered later by column inference. Excel cells keep their native
/// cell types. JSON rows go through the same flattening as submissions.
pub fn load(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(FieldfolioError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }
    match ExportFormat::from_extension(path)? {
        ExportFormat::Csv => load_csv(path),
        ExportFormat::Excel => load_excel(path),
        ExportFormat::Json => load_json(path),
    }
}

fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?;
        let row: Vec<Value> = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    Value::Null
                } else {
                    Value::Str(cell.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Dataset::new(columns, rows))
}

fn load_excel(path: &Path) -> Result<Dataset> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FieldfolioError::Parse(format!("{}: workbook has no sheets", path.display())))?
        .map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?;

    let mut row_iter = range.rows();
    let columns: Vec<String> = match row_iter.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Dataset::empty()),
    };

    let rows = row_iter
        .map(|row| {
            (0..columns.len())
                .map(|i| match row.get(i) {
                    None | Some(Data::Empty) => Value::Null,
                    Some(Data::String(s)) => Value::Str(s.clone()),
                    Some(Data::Float(f)) => Value::Float(*f),
                    Some(Data::Int(i)) => Value::Int(*i),
                    Some(Data::Bool(b)) => Value::Bool(*b),
                    Some(other) => Value::Str(other.to_string()),
                })
                .collect()
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn load_json(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_reader(reader)
        .map_err(|e| FieldfolioError::Parse(format!("{}: {}", path.display(), e)))?;

    let submissions: Vec<Submission> = rows.into_iter().map(Submission::new).collect();
    Ok(flatten(&submissions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "a\tb\n").unwrap();
        assert!(matches!(
            load(&path),
            Err(FieldfolioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            load(Path::new("/nonexistent/data.csv")),
            Err(FieldfolioError::Io(_))
        ));
    }

    #[test]
    fn test_load_csv_empty_cells_become_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "name,age").unwrap();
        writeln!(f, "ada,36").unwrap();
        writeln!(f, "grace,").unwrap();
        drop(f);

        let ds = load(&path).unwrap();
        assert_eq!(ds.columns(), &["name", "age"]);
        assert_eq!(ds.rows()[0][1], Value::Str("36".to_string()));
        assert_eq!(ds.rows()[1][1], Value::Null);
    }

    #[test]
    fn test_load_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(FieldfolioError::Parse(_))));
    }
}
