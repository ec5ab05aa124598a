// src/grading/keywords.rs

use super::{Nutrient, NutrientProfile, P2O5_TO_P, parse_number};
use once_cell::sync::Lazy;
use regex::Regex;

/// What may follow a nutrient number: a percent sign, a unit, punctuation,
/// or one of the qualifier words customs brokers put after the value.
const TERMINATORS: &str = r"%|мас|в пересчёте|марка|гост|п/п|кг|л|литров|литра|мешк|пакет|упаковк|порошок|гранулы|таблетк|вес|брутто|нетто|пластик|бумажн|поддон|паллет|предназначен|используется|входит|содержит|состав|не более|не менее|не превышает|минимум|максимум|,|\.|;|:|$";

/// Keyword patterns per nutrient, in the order they are tried. The factor
/// converts the value read after the keyword into the elemental fraction.
const KEYWORDS: &[(Nutrient, &str, f64)] = &[
    (Nutrient::N, r"\bазот", 1.0),
    // mixed-script spelling with a Latin "n"
    (Nutrient::N, r"\bnитрат", 1.0),
    (Nutrient::N, r"\bn\s*содержащие", 1.0),
    (Nutrient::N, r"\bсодержание\s*азота", 1.0),
    (Nutrient::N, r"\bаммонийный\s*азот", 1.0),
    (Nutrient::N, r"\bнитрат", 1.0),
    (Nutrient::N, r"\bn\s*общий", 1.0),
    (Nutrient::N, r"\bаммиачный\s*азот", 1.0),
    (Nutrient::P, r"\bфосфор", 1.0),
    (Nutrient::P, r"\bp2o5", P2O5_TO_P),
    (Nutrient::P, r"\bп2о5", P2O5_TO_P),
    (Nutrient::P, r"\bphosphorus", 1.0),
    (Nutrient::P, r"\bсодержание\s*фосфора", 1.0),
    (Nutrient::P, r"\bфосфаты", 1.0),
    (Nutrient::K, r"\bкали[йяие]", 1.0),
    (Nutrient::K, r"\bk2o", 1.0),
    (Nutrient::K, r"\bкалийные", 1.0),
    (Nutrient::K, r"\bсодержание\s*калия", 1.0),
    (Nutrient::Ca, r"\bкальций", 1.0),
    (Nutrient::Ca, r"\bcao", 1.0),
    (Nutrient::Ca, r"\bca\s*содержащие", 1.0),
    (Nutrient::Ca, r"\bизвесть", 1.0),
    (Nutrient::Ca, r"\bкарбонат\s*кальца", 1.0),
    (Nutrient::Ca, r"\bсодержание\s*кальция", 1.0),
    // Latin "cac" + Cyrillic "о"
    (Nutrient::Ca, r"\bcacо3", 1.0),
];

struct Keyword {
    nutrient: Nutrient,
    pattern: Regex,
    factor: f64,
}

static KEYWORD_PATTERNS: Lazy<Vec<Keyword>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .map(|&(nutrient, keyword, factor)| Keyword {
            nutrient,
            pattern: Regex::new(&format!(
                r"(?i){keyword}\D*?(\d+(?:[,.]\d+)?)\s*(?:{TERMINATORS})"
            ))
            .expect("keyword pattern"),
            factor,
        })
        .collect()
});

/// Primary pass: for each nutrient, the first keyword followed by a
/// terminated number decides the value. A number over 100 still ends the
/// search for that nutrient but is stored as zero.
pub(super) fn scan_keywords(text: &str) -> NutrientProfile {
    let mut profile = NutrientProfile::default();

    for nutrient in Nutrient::ALL {
        let found = KEYWORD_PATTERNS
            .iter()
            .filter(|kw| kw.nutrient == nutrient)
            .find_map(|kw| {
                let caps = kw.pattern.captures(text)?;
                let raw = parse_number(&caps[1])?;
                Some(if raw > 100.0 { 0.0 } else { raw * kw.factor })
            });

        if let Some(value) = found {
            profile.set(nutrient, value);
        }
    }

    profile
}
