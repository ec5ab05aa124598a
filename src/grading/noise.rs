// src/grading/noise.rs

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// GOST and TU references, most specific first so a shorter pattern never
/// eats the head of a longer token and leaves digits behind.
static STANDARD_REFERENCES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ГОСТ 2-2013: часть 1
        r"гост\s*\d{1,5}[-–]\d{2,4}\s*:\s*часть\s*\d+",
        // ГОСТ 2081-2010 (2010)
        r"гост\s*\d{1,5}[-–]\d{2,4}\s*\(\d{2,4}\)",
        // ГОСТ 123-456-78
        r"гост\s*\d{1,5}[-–]\d{2,4}[-–]\d{2,4}",
        // ГОСТ 2-2013, ГОСТ 2081-2010
        r"гост\s*\d{1,5}[-–]\d{2,4}",
        r"гост\s*\d{1,2}[-–]\d{3,4}",
        r"гост\d{1,5}[-–]\d{2,4}",
        // ТУ 2181-073-05761695-2016
        r"ту\s*\d{4}-\d{3}-\d{8}-\d{4}",
        r"ту\s*\d{2}\.\d{2}\.\d{2}-\d{3}-\d{8}-\d{4}",
        r"ту\s*\d{2}\.\d{2}\.\d{2}-\d{3}-\d{4}",
        r"ту\s*\d{2}\.\d{2}\.\d{2}-\d{4}-\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("standard reference pattern"))
    .collect()
});

// Cyrillic and Latin letters may be mixed ("10 кg").
static PACKAGING_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+(?:[.,]\d+)?\s*[кk][гg]").expect("packaging weight pattern"));

/// Lower-case and collapse every whitespace run (no-break and ideographic
/// spaces included) into one ASCII space. Missing text becomes `"nan"`.
pub fn normalize(raw: Option<&str>) -> String {
    let lowered = raw.unwrap_or("nan").to_lowercase();
    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

/// Delete standard references and packaging weights so their digits are not
/// read as nutrient percentages later.
pub fn strip_noise(text: &str) -> String {
    let mut cleaned = text.to_string();
    for re in STANDARD_REFERENCES.iter() {
        if re.is_match(&cleaned) {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
    }
    strip_weights(&cleaned)
}

/// Remove "10 кг" style quantities that stand on their own. "10кгс", "x10kg"
/// and the tail of a ratio like "16:16:16,50кг" are left alone.
fn strip_weights(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in PACKAGING_WEIGHT.find_iter(text) {
        if is_standalone(text, m.start(), m.end()) {
            out.push_str(&text[last..m.start()]);
            last = m.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

// Ratio separators and decimal marks are never a left boundary.
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '['));
    let after = text[end..]
        .chars()
        .next()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
    before && after
}
