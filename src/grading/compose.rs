// src/grading/compose.rs

use super::{Nutrient, NutrientProfile};
use serde::Deserialize;
use std::collections::HashSet;

/// Grade shown when nothing was found for an allowed product type.
pub const NO_GRADE_SENTINEL: &str = "X-X-X";

const WATER_SOLUBLE_MARKER: &str = "водорастворим";

const DEFAULT_ALLOWED: &[&str] = &[
    "НПК",
    "МАФ",
    "Карбамид",
    "Прочие удобрения животного или растительного происхождения",
    "Прочие фосфорные удобрения",
    "PK",
    "CAN",
    "AN",
    "Прочие NP/NPK",
    "НПК в таблетках или упаковке менее 10 кг",
    "AS",
    "КАС",
    "Калий",
    "SOP",
    "ДАФ",
    "NP",
    "Нитрат натрия",
    "NS",
    "CN",
    "Прочие калийные удобрения",
    "Удобрения животного или растительного происхождения",
    "Прочие суперфосфаты",
    "Суперфосфаты",
];

/// Business rules applied after extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GradeRules {
    /// Product types that keep a grade at all.
    pub allowed: HashSet<String>,
    /// Product types eligible for the water-soluble label.
    pub water_soluble_types: Vec<String>,
    pub water_soluble_label: String,
}

impl Default for GradeRules {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED.iter().map(|s| s.to_string()).collect(),
            water_soluble_types: vec!["НПК".to_string(), "Прочие NP/NPK".to_string()],
            water_soluble_label: "ВРУ".to_string(),
        }
    }
}

impl GradeRules {
    pub fn is_allowed(&self, product_type: Option<&str>) -> bool {
        product_type.is_some_and(|pt| self.allowed.contains(pt))
    }
}

/// Nutrients a product type can never carry in its grade.
fn suppressed(product_type: &str) -> &'static [Nutrient] {
    match product_type {
        "Калий" => &[Nutrient::N, Nutrient::P],
        "NP" => &[Nutrient::K],
        "PK" => &[Nutrient::N],
        "NS" => &[Nutrient::P, Nutrient::K],
        "Ca" => &[Nutrient::N, Nutrient::P, Nutrient::K],
        _ => &[],
    }
}

/// Whole numbers without a fractional part, everything else to two places.
fn render(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Turn a profile into an "N-P-K" label for the given product type.
///
/// Returns [`NO_GRADE_SENTINEL`] when every component is zero, `""` when every
/// component is below 1, and `""` for product types outside the allow-list
/// no matter what the profile holds.
pub fn determine_grade(
    profile: &NutrientProfile,
    product_type: Option<&str>,
    rules: &GradeRules,
) -> String {
    let blocked = product_type.map(suppressed).unwrap_or(&[]);
    let [n, p, k] = [Nutrient::N, Nutrient::P, Nutrient::K].map(|nutrient| {
        let value = profile.get(nutrient);
        if blocked.contains(&nutrient) || !(value > 0.0 && value <= 100.0) {
            0.0
        } else {
            value
        }
    });

    let grade = if [n, p, k].iter().all(|v| *v == 0.0) {
        NO_GRADE_SENTINEL.to_string()
    } else if [n, p, k].iter().all(|v| *v < 1.0) {
        String::new()
    } else {
        format!("{}-{}-{}", render(n), render(p), render(k))
    };

    if rules.is_allowed(product_type) {
        grade
    } else {
        String::new()
    }
}

/// Label for water-soluble NPK products, decided on the raw description.
pub fn water_soluble_label<'r>(
    description: Option<&str>,
    product_type: Option<&str>,
    rules: &'r GradeRules,
) -> Option<&'r str> {
    let eligible = product_type.is_some_and(|pt| rules.water_soluble_types.iter().any(|t| t == pt));
    let marked = description.is_some_and(|d| d.to_lowercase().contains(WATER_SOLUBLE_MARKER));
    (eligible && marked).then_some(rules.water_soluble_label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(n: f64, p: f64, k: f64) -> NutrientProfile {
        NutrientProfile { n, p, k, ca: 0.0 }
    }

    #[test]
    fn test_plain_grade() {
        let rules = GradeRules::default();
        assert_eq!(determine_grade(&profile(16.0, 16.0, 16.0), Some("НПК"), &rules), "16-16-16");
        assert_eq!(determine_grade(&profile(34.4, 0.0, 0.0), Some("AN"), &rules), "34.4-0-0");
    }

    #[test]
    fn test_fractions_rendered_to_two_places() {
        let rules = GradeRules::default();
        let grade = determine_grade(&profile(0.0, 46.0 * 0.436, 0.0), Some("НПК"), &rules);
        assert_eq!(grade, "0-20.06-0");
    }

    #[test]
    fn test_suppression_table() {
        let rules = GradeRules::default();
        let full = profile(10.0, 20.0, 30.0);
        assert_eq!(determine_grade(&full, Some("Калий"), &rules), "0-0-30");
        assert_eq!(determine_grade(&full, Some("NP"), &rules), "10-20-0");
        assert_eq!(determine_grade(&full, Some("PK"), &rules), "0-20-30");
        assert_eq!(determine_grade(&full, Some("NS"), &rules), "10-0-0");
        assert_eq!(determine_grade(&full, Some("МАФ"), &rules), "10-20-30");
    }

    #[test]
    fn test_calcium_product_needs_allow_listing() {
        let full = profile(10.0, 20.0, 30.0);
        assert_eq!(determine_grade(&full, Some("Ca"), &GradeRules::default()), "");

        let mut rules = GradeRules::default();
        rules.allowed.insert("Ca".to_string());
        assert_eq!(determine_grade(&full, Some("Ca"), &rules), NO_GRADE_SENTINEL);
    }

    #[test]
    fn test_all_zero_is_sentinel() {
        let rules = GradeRules::default();
        assert_eq!(determine_grade(&NutrientProfile::default(), Some("НПК"), &rules), "X-X-X");
    }

    #[test]
    fn test_insignificant_grade_collapses() {
        let rules = GradeRules::default();
        assert_eq!(determine_grade(&profile(0.5, 0.3, 0.2), Some("НПК"), &rules), "");
        assert_eq!(determine_grade(&profile(0.5, 1.0, 0.0), Some("НПК"), &rules), "0.5-1-0");
    }

    #[test]
    fn test_out_of_range_values_coerced() {
        let rules = GradeRules::default();
        assert_eq!(determine_grade(&profile(120.0, -3.0, 15.0), Some("НПК"), &rules), "0-0-15");
    }

    #[test]
    fn test_disallowed_or_missing_product_type() {
        let rules = GradeRules::default();
        let full = profile(20.0, 20.0, 20.0);
        assert_eq!(determine_grade(&full, Some("Неизвестно"), &rules), "");
        assert_eq!(determine_grade(&full, None, &rules), "");
    }

    #[test]
    fn test_water_soluble_label() {
        let rules = GradeRules::default();
        let desc = Some("Удобрение ВОДОРАСТВОРИМОЕ NPK 20-20-20");
        assert_eq!(water_soluble_label(desc, Some("НПК"), &rules), Some("ВРУ"));
        assert_eq!(water_soluble_label(desc, Some("Прочие NP/NPK"), &rules), Some("ВРУ"));
        assert_eq!(water_soluble_label(desc, Some("МАФ"), &rules), None);
        assert_eq!(water_soluble_label(Some("NPK 20-20-20"), Some("НПК"), &rules), None);
        assert_eq!(water_soluble_label(None, Some("НПК"), &rules), None);
    }
}
