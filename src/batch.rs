// src/batch.rs

use crate::config::{ColumnConfig, Config};
use crate::grading::{self, GradeRules};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// One customs-declaration row: column name -> cell value.
pub type Record = Map<String, Value>;

pub const PRODUCT_FIELD: &str = "Product";
pub const GRADE_FIELD: &str = "Grade";
pub const PRODUCT_TYPE_FIELD: &str = "Product Type";

const OUTPUT_SUFFIX: &str = " SORTING";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no column starting with '{prefix}' in batch")]
    MissingColumn { prefix: String },
    #[error("malformed batch: {0}")]
    Shape(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// ТН ВЭД code -> product type lookup.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    by_code: HashMap<String, String>,
}

impl ProductCatalog {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let by_code = entries
            .into_iter()
            .map(|(code, product)| (code.trim().to_string(), product))
            .collect();
        Self { by_code }
    }

    pub fn lookup(&self, code: &Value) -> Option<&str> {
        let key = code_key(code)?;
        self.by_code.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }
}

/// Codes arrive as text or as numbers (spreadsheet exports turn
/// "3105100000" into 3105100000.0); both map to the same key.
fn code_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                Some(i.to_string())
            } else if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Description cell as text; numbers are graded on their printed form.
fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Everything needed to grade rows, built once per run.
pub struct Grader {
    catalog: ProductCatalog,
    columns: ColumnConfig,
    rules: GradeRules,
}

/// Counts reported after a batch is written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub unmapped: usize,
    pub graded: usize,
    pub water_soluble: usize,
}

impl Grader {
    pub fn new(catalog: ProductCatalog, columns: ColumnConfig, rules: GradeRules) -> Self {
        Self {
            catalog,
            columns,
            rules,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let catalog = ProductCatalog::new(cfg.products.clone());
        Self::new(catalog, cfg.columns.clone(), cfg.rules.clone())
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Add `Product`, `Grade` and `Product Type` to every row, keeping row
    /// order and the original columns.
    pub fn grade_records(
        &self,
        records: Vec<Record>,
    ) -> Result<(Vec<Record>, BatchSummary), BatchError> {
        let mut summary = BatchSummary::default();
        if records.is_empty() {
            return Ok((records, summary));
        }

        let (code_col, desc_col) = {
            let columns = column_names(&records);
            (
                find_column(&columns, &self.columns.code_prefix)?.to_string(),
                find_column(&columns, &self.columns.description_prefix)?.to_string(),
            )
        };

        let mut graded = Vec::with_capacity(records.len());
        for mut record in records {
            let product = record
                .get(&code_col)
                .and_then(|code| self.catalog.lookup(code))
                .map(str::to_string);
            let description = cell_text(record.get(&desc_col));

            let grade = grading::grade_description(
                description.as_deref(),
                product.as_deref(),
                &self.rules,
            );
            let label = grading::water_soluble_label(
                description.as_deref(),
                product.as_deref(),
                &self.rules,
            )
            .unwrap_or_default();

            summary.rows += 1;
            if product.is_none() {
                summary.unmapped += 1;
            }
            if !grade.is_empty() {
                summary.graded += 1;
            }
            if !label.is_empty() {
                summary.water_soluble += 1;
            }

            record.insert(
                PRODUCT_FIELD.to_string(),
                product.map_or(Value::Null, Value::String),
            );
            record.insert(GRADE_FIELD.to_string(), Value::String(grade));
            record.insert(PRODUCT_TYPE_FIELD.to_string(), Value::String(label.to_string()));
            graded.push(record);
        }

        Ok((graded, summary))
    }

    /// Grade one batch file and write `<stem> SORTING.json` into `output_dir`.
    pub fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(PathBuf, BatchSummary), BatchError> {
        let content = fs::read_to_string(input)?;
        let records = parse_batch(&content)?;
        info!(file = %input.display(), rows = records.len(), "Loaded batch");

        let (graded, summary) = self.grade_records(records)?;
        if summary.unmapped > 0 {
            warn!(
                file = %input.display(),
                unmapped = summary.unmapped,
                "Rows with codes missing from the product catalog"
            );
        }

        let output = output_path(input, output_dir);
        fs::write(&output, serde_json::to_string_pretty(&graded)?)?;
        Ok((output, summary))
    }
}

/// Parse a batch: a JSON array of row objects.
pub fn parse_batch(content: &str) -> Result<Vec<Record>, BatchError> {
    let Value::Array(items) = serde_json::from_str::<Value>(content)? else {
        return Err(BatchError::Shape("top-level value is not an array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(BatchError::Shape(format!("row {i} is not an object"))),
        })
        .collect()
}

/// Union of column names in first-seen order.
fn column_names(records: &[Record]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for key in records.iter().flat_map(|r| r.keys()) {
        if !names.contains(&key.as_str()) {
            names.push(key);
        }
    }
    names
}

/// First column whose name starts with `prefix`.
fn find_column<'a>(columns: &[&'a str], prefix: &str) -> Result<&'a str, BatchError> {
    columns
        .iter()
        .copied()
        .find(|name| name.starts_with(prefix))
        .ok_or_else(|| BatchError::MissingColumn {
            prefix: prefix.to_string(),
        })
}

fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{OUTPUT_SUFFIX}.json"))
}

/// Batch files in `dir`, sorted by name. Our own outputs are skipped so an
/// output folder can double as input.
pub fn list_batches(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .filter(|path| {
            !path
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CODE_COL: &str = "G33 (код товара по ТН ВЭД РФ)";
    const DESC_COL: &str = "G31_1 (Описание и характеристика товара)";

    fn grader() -> Grader {
        let catalog = ProductCatalog::new([
            ("3105100000".to_string(), "НПК".to_string()),
            ("3104200000".to_string(), "Калий".to_string()),
            ("2834210000".to_string(), "Селитра калиевая".to_string()),
        ]);
        Grader::new(catalog, ColumnConfig::default(), GradeRules::default())
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_code_key_forms() {
        assert_eq!(code_key(&json!("3105100000 ")), Some("3105100000".to_string()));
        assert_eq!(code_key(&json!(3105100000u64)), Some("3105100000".to_string()));
        assert_eq!(code_key(&json!(3105100000.0)), Some("3105100000".to_string()));
        assert_eq!(code_key(&json!(null)), None);
        assert_eq!(code_key(&json!("")), None);
    }

    #[test]
    fn test_grade_records_adds_fields_in_order() {
        let rows = vec![
            record(json!({
                "G32": 1,
                CODE_COL: 3105100000.0,
                DESC_COL: "Удобрение водорастворимое NPK 20-20-20, мешки 25 кг",
            })),
            record(json!({
                "G32": 2,
                CODE_COL: "3104200000",
                DESC_COL: "Калий хлористый, в пересчете на K2O 60%",
            })),
            record(json!({
                "G32": 3,
                CODE_COL: "2834210000",
                DESC_COL: "Селитра калиевая азот 13%",
            })),
            record(json!({
                "G32": 4,
                CODE_COL: "9999999999",
                DESC_COL: null,
            })),
        ];

        let (graded, summary) = grader().grade_records(rows).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                rows: 4,
                unmapped: 1,
                graded: 2,
                water_soluble: 1
            }
        );

        let keys: Vec<&str> = graded[0].keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["G32", CODE_COL, DESC_COL, PRODUCT_FIELD, GRADE_FIELD, PRODUCT_TYPE_FIELD]
        );

        assert_eq!(graded[0][GRADE_FIELD], json!("20-20-20"));
        assert_eq!(graded[0][PRODUCT_TYPE_FIELD], json!("ВРУ"));
        assert_eq!(graded[1][PRODUCT_FIELD], json!("Калий"));
        assert_eq!(graded[1][GRADE_FIELD], json!("0-0-60"));
        // mapped but not an allowed fertilizer type
        assert_eq!(graded[2][GRADE_FIELD], json!(""));
        assert_eq!(graded[3][PRODUCT_FIELD], Value::Null);
        assert_eq!(graded[3][GRADE_FIELD], json!(""));
        assert_eq!(graded[3]["G32"], json!(4));
    }

    #[test]
    fn test_missing_description_column_is_fatal() {
        let rows = vec![record(json!({ CODE_COL: "3105100000", "G31_2": "x" }))];
        let err = grader().grade_records(rows).unwrap_err();
        assert!(matches!(err, BatchError::MissingColumn { ref prefix } if prefix == "G31_1"));
    }

    #[test]
    fn test_parse_batch_rejects_non_objects() {
        assert!(matches!(parse_batch("{}"), Err(BatchError::Shape(_))));
        assert!(matches!(parse_batch("[1, 2]"), Err(BatchError::Shape(_))));
        assert!(matches!(parse_batch("not json"), Err(BatchError::Json(_))));
        assert_eq!(parse_batch("[]").unwrap().len(), 0);
    }

    #[test]
    fn test_process_file_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ВЭД март.json");
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(
            &input,
            json!([{ CODE_COL: "3105100000", DESC_COL: "NPK 16:16:16" }]).to_string(),
        )
        .unwrap();

        let (output, summary) = grader().process_file(&input, &out_dir).unwrap();
        assert_eq!(output, out_dir.join("ВЭД март SORTING.json"));
        assert_eq!(summary.graded, 1);

        let written = parse_batch(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written[0][GRADE_FIELD], json!("16-16-16"));
    }

    #[test]
    fn test_list_batches_skips_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.JSON", "a SORTING.json", "notes.txt"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        let files = list_batches(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }
}
