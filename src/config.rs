//! Dashboard configuration.
//!
//! Values come from an optional `dashboard.toml`; command-line flags
//! override whatever the file sets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub inputs: InputsConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Locations of the survey tables and the coordinate file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_expenses")]
    pub expenses: PathBuf,

    #[serde(default = "default_income")]
    pub income: PathBuf,

    #[serde(default = "default_coordinates")]
    pub coordinates: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            expenses: default_expenses(),
            income: default_income(),
            coordinates: default_coordinates(),
        }
    }
}

fn default_expenses() -> PathBuf {
    PathBuf::from("gastosUnificados.csv")
}

fn default_income() -> PathBuf {
    PathBuf::from("ingresosUnificados.csv")
}

fn default_coordinates() -> PathBuf {
    PathBuf::from("mexico.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory charts and the Markdown report are written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_charts")]
    pub charts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            charts: default_charts(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dashboard_output")
}

fn default_charts() -> bool {
    true
}

/// Initial filter choices. Empty lists and unset values fall back to the
/// dashboard defaults (every region/year, first available entity, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub regions: Vec<String>,

    #[serde(default)]
    pub years: Vec<i64>,

    pub profit_year: Option<i64>,
    pub focus_year: Option<i64>,
    pub entity: Option<String>,
    pub focus_category: Option<String>,
    pub compare_category: Option<String>,
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// An explicitly named file must exist; otherwise `dashboard.toml` is
    /// used when present and defaults apply when it is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.inputs.expenses, PathBuf::from("gastosUnificados.csv"));
        assert_eq!(config.inputs.coordinates, PathBuf::from("mexico.json"));
        assert!(config.output.charts);
        assert!(config.selection.years.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[inputs]
income = "data/ingresos.csv"

[selection]
years = [2020, 2022]
entity = "Jalisco"
"#
        )
        .unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.inputs.income, PathBuf::from("data/ingresos.csv"));
        assert_eq!(config.inputs.expenses, PathBuf::from("gastosUnificados.csv"));
        assert_eq!(config.selection.years, vec![2020, 2022]);
        assert_eq!(config.selection.entity.as_deref(), Some("Jalisco"));
        assert_eq!(config.output.dir, PathBuf::from("dashboard_output"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DashboardConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
