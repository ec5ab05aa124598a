// src/grading/mod.rs

mod compose;
mod keywords;
mod noise;
mod ratio;
mod refine;

pub use compose::{GradeRules, determine_grade, water_soluble_label};
pub use noise::{normalize, strip_noise};

use tracing::debug;

/// Mass fraction of elemental phosphorus in P2O5.
pub const P2O5_TO_P: f64 = 0.436;

/// A nutrient tracked by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    N,
    P,
    K,
    Ca,
}

impl Nutrient {
    /// Extraction order. Grades only use the first three.
    pub const ALL: [Nutrient; 4] = [Nutrient::N, Nutrient::P, Nutrient::K, Nutrient::Ca];
}

/// Nutrient percentages read from a description. `0.0` means "not found".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutrientProfile {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub ca: f64,
}

impl NutrientProfile {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::N => self.n,
            Nutrient::P => self.p,
            Nutrient::K => self.k,
            Nutrient::Ca => self.ca,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        match nutrient {
            Nutrient::N => self.n = value,
            Nutrient::P => self.p = value,
            Nutrient::K => self.k = value,
            Nutrient::Ca => self.ca = value,
        }
    }

    pub fn is_unset(&self, nutrient: Nutrient) -> bool {
        self.get(nutrient) == 0.0
    }
}

/// Parse a captured number, accepting `,` as the decimal separator.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}

/// Parse a captured number and reject anything that cannot be a percentage.
pub(crate) fn parse_percent(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|v| *v <= 100.0)
}

/// Run the full extraction cascade over a raw description.
///
/// An explicit ratio ("16-16-16", "npk 10:10:10") is authoritative and
/// skips the keyword and unit-conversion passes.
pub fn extract_profile(description: Option<&str>) -> NutrientProfile {
    let text = strip_noise(&normalize(description));

    if let Some(profile) = ratio::match_ratio(&text) {
        debug!(text = %text, ?profile, "Explicit ratio matched");
        return profile;
    }

    let mut profile = keywords::scan_keywords(&text);
    refine::apply_refinements(&text, &mut profile);
    debug!(text = %text, ?profile, "Keyword extraction complete");
    profile
}

/// Description + product type straight to a grade label.
pub fn grade_description(
    description: Option<&str>,
    product_type: Option<&str>,
    rules: &GradeRules,
) -> String {
    let profile = extract_profile(description);
    determine_grade(&profile, product_type, rules)
}
