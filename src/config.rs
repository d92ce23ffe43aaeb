use crate::report::{ChartKind, ChartSpec};
use crate::{FieldfolioError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = ".fieldfolio";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub odk: OdkConfig,
    pub report: ReportConfig,
}

/// Connection defaults for the remote server. The password is kept out
/// of the saved file unless the user explicitly asks for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OdkConfig {
    pub base_url: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub project_id: Option<u64>,
    pub form_id: Option<String>,
}

impl OdkConfig {
    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.email.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    Letter,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

impl PageSize {
    /// Page dimensions in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Rendering options for one report run. Read-only during generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub include_summary: bool,
    pub include_charts: bool,
    pub include_data_table: bool,
    pub max_table_rows: usize,
    pub page_size: PageSize,
    pub charts: Vec<ChartSpec>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            title: "Survey Data Report".to_string(),
            include_summary: true,
            include_charts: true,
            include_data_table: true,
            max_table_rows: 20,
            page_size: PageSize::A4,
            charts: Vec::new(),
        }
    }
}

impl Config {
    /// Structural validation, applied when the file is loaded so that
    /// mistakes surface before any network or render work starts.
    pub fn validate(&self) -> Result<()> {
        if self.report.max_table_rows == 0 {
            return Err(FieldfolioError::Config(
                "report.max_table_rows must be at least 1".to_string(),
            ));
        }
        for spec in &self.report.charts {
            spec.validate()?;
        }
        Ok(())
    }
}

/// Resolve the configuration directory: an explicit override, or
/// `~/.fieldfolio`.
pub fn config_dir(override_dir: Option<PathBuf>) -> PathBuf {
    match override_dir {
        Some(dir) => dir,
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME),
    }
}

pub fn config_file(override_dir: Option<PathBuf>) -> PathBuf {
    config_dir(override_dir).join(CONFIG_FILE_NAME)
}

/// Load the config file, or defaults when it does not exist yet.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)
        .map_err(|e| FieldfolioError::Config(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_yaml::to_string(config)
        .map_err(|e| FieldfolioError::Config(format!("failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// A filled-in example configuration, written by `config sample`.
pub fn sample() -> Config {
    Config {
        odk: OdkConfig {
            base_url: "https://central.example.org".to_string(),
            email: "you@example.org".to_string(),
            password: String::new(),
            project_id: Some(1),
            form_id: Some("household_survey".to_string()),
        },
        report: ReportConfig {
            charts: vec![
                ChartSpec {
                    kind: ChartKind::Bar,
                    x: "status".to_string(),
                    y: None,
                    title: "Submission Status Distribution".to_string(),
                },
                ChartSpec {
                    kind: ChartKind::Pie,
                    x: "category".to_string(),
                    y: None,
                    title: "Category Distribution".to_string(),
                },
            ],
            ..ReportConfig::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.report.max_table_rows, 20);
        assert!(config.report.include_summary);
        assert_eq!(config.report.page_size, PageSize::A4);
    }

    #[test]
    fn test_round_trip_preserves_chart_specs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.odk.base_url, "https://central.example.org");
        assert_eq!(loaded.report.charts.len(), 2);
        assert_eq!(loaded.report.charts[0].kind, ChartKind::Bar);
    }

    #[test]
    fn test_password_is_not_saved_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = sample();
        config.odk.password = "hunter2".to_string();
        let mut scrubbed = config.clone();
        scrubbed.odk.password = String::new();
        save(&path, &scrubbed).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("hunter2"));
        assert!(!raw.contains("password"));
    }

    #[test]
    fn test_invalid_chart_spec_fails_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let yaml = "report:\n  charts:\n    - type: line\n      x: day\n";
        std::fs::write(&path, yaml).unwrap();

        assert!(matches!(load(&path), Err(FieldfolioError::Config(_))));
    }

    #[test]
    fn test_zero_table_rows_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "report:\n  max_table_rows: 0\n").unwrap();

        assert!(matches!(load(&path), Err(FieldfolioError::Config(_))));
    }

    #[test]
    fn test_page_size_names_round_trip() {
        let yaml = "report:\n  page_size: Letter\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.report.page_size, PageSize::Letter);
        assert_eq!(config.report.page_size.dimensions_mm(), (215.9, 279.4));
    }
}
