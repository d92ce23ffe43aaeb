use crate::data::dataset::Dataset;
use crate::data::value::Value;
use crate::{FieldfolioError, Result};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Sheet name used for Excel output, matching the header-row convention
/// of the CSV writer.
const EXCEL_SHEET_NAME: &str = "Submissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
}

impl FromStr for ExportFormat {
    type Err = FieldfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            other => Err(FieldfolioError::UnsupportedFormat(format!(
                "unknown export format '{}' (expected csv, excel, or json)",
                other
            ))),
        }
    }
}

impl ExportFormat {
    /// Infer the format from a file extension.
    pub fn from_extension(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "xls" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            other => Err(FieldfolioError::UnsupportedFormat(format!(
                "unrecognized file extension '.{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

/// Write a dataset to disk. Column order is preserved exactly as computed
/// by `flatten`. The file is written to a temporary path in the target
/// directory and swapped in atomically, so an interrupted run never leaves
/// a partial file behind.
///
/// Contract note: CSV stringifies every cell, so numbers loaded back from
/// CSV come back as strings. JSON round-trips cell types verbatim.
pub fn write(dataset: &Dataset, path: &Path, format: ExportFormat) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };

    match format {
        ExportFormat::Csv => write_csv(dataset, tmp.as_file())?,
        ExportFormat::Json => write_json(dataset, tmp.as_file())?,
        ExportFormat::Excel => write_excel(dataset, tmp.path())?,
    }

    tmp.persist(path).map_err(|e| FieldfolioError::Io(e.error))?;
    Ok(())
}

fn write_csv(dataset: &Dataset, file: &std::fs::File) -> Result<()> {
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(dataset.columns())
        .map_err(|e| FieldfolioError::Io(std::io::Error::other(e)))?;
    for row in dataset.rows() {
        let record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writer
            .write_record(&record)
            .map_err(|e| FieldfolioError::Io(std::io::Error::other(e)))?;
    }
    writer
        .flush()
        .map_err(|e| FieldfolioError::Io(std::io::Error::other(e)))?;
    Ok(())
}

fn write_json(dataset: &Dataset, file: &std::fs::File) -> Result<()> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = dataset
        .rows()
        .iter()
        .map(|row| {
            dataset
                .columns()
                .iter()
                .zip(row.iter())
                .map(|(col, cell)| {
                    let json = serde_json::to_value(cell).unwrap_or(serde_json::Value::Null);
                    (col.clone(), json)
                })
                .collect()
        })
        .collect();

    let mut file = file;
    serde_json::to_writer_pretty(&mut file, &rows)
        .map_err(|e| FieldfolioError::Io(std::io::Error::other(e)))?;
    file.flush()?;
    Ok(())
}

fn write_excel(dataset: &Dataset, path: &Path) -> Result<()> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(EXCEL_SHEET_NAME)
        .map_err(|e| FieldfolioError::Io(std::io::Error::other(e.to_string())))?;

    for (col, name) in dataset.columns().iter().enumerate() {
        worksheet
            .write_string(0, col as u16, name)
            .map_err(|e| FieldfolioError::Io(std::io::Error::other(e.to_string())))?;
    }

    for (r, row) in dataset.rows().iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let col_idx = c as u16;
            let result = match cell {
                Value::Null => Ok(&mut *worksheet),
                Value::Bool(b) => worksheet.write_boolean(row_idx, col_idx, *b),
                Value::Int(i) => worksheet.write_number(row_idx, col_idx, *i as f64),
                Value::Float(f) => worksheet.write_number(row_idx, col_idx, *f),
                Value::Str(s) => worksheet.write_string(row_idx, col_idx, s),
            };
            result.map_err(|e| FieldfolioError::Io(std::io::Error::other(e.to_string())))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| FieldfolioError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}
