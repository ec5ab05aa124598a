use crate::grading::GradeRules;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub rules: GradeRules,
    /// ТН ВЭД code -> product type ("Вид МУ").
    #[serde(default)]
    pub products: BTreeMap<String, String>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Required columns are found by name prefix, the headers in customs
/// exports carry a long description after the field id.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub code_prefix: String,
    pub description_prefix: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            code_prefix: "G33".to_string(),
            description_prefix: "G31_1".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
