// src/grading/refine.rs

use super::{Nutrient, NutrientProfile, P2O5_TO_P, parse_percent};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// How a refinement interacts with what the keyword pass already found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Apply {
    /// Replace the current value unconditionally.
    Override,
    /// Only fill a nutrient that is still zero.
    IfUnset,
}

struct Refinement {
    nutrient: Nutrient,
    apply: Apply,
    factor: f64,
    pattern: Regex,
}

const NUM: &str = r"(\d+(?:[,.]\d+)?)";

/// Oxide conversions and looser fallbacks. Order matters: each `IfUnset`
/// step only sees a nutrient that every earlier step left at zero.
static REFINEMENTS: Lazy<Vec<Refinement>> = Lazy::new(|| {
    [
        // "в пересчёте на K2O 50%" is already elemental-equivalent for grading
        (Nutrient::K, Apply::Override, 1.0, format!(r"в\s*пересч[ёе]те.*?k2o\D*{NUM}")),
        (Nutrient::K, Apply::IfUnset, 1.0, format!(r"k2o\D*{NUM}")),
        (Nutrient::P, Apply::Override, P2O5_TO_P, format!(r"в\s*пересч[ёе]те.*?(?:p2o5|п2о5)\D*{NUM}")),
        (Nutrient::P, Apply::IfUnset, P2O5_TO_P, format!(r"(?:p2o5|п2о5)\D*{NUM}")),
        (Nutrient::P, Apply::IfUnset, 1.0, format!(r"фосфорн\w*\s*ангидрид\D*{NUM}")),
        // "массовая доля азота - 18"
        (Nutrient::N, Apply::IfUnset, 1.0, format!(r"азот\w*\D*{NUM}")),
        // "содержащий 46,2 мас.% азота"
        (Nutrient::N, Apply::IfUnset, 1.0, format!(r"содерж\w*\D*{NUM}\s*мас\.?%[^а-я]*азот")),
    ]
    .into_iter()
    .map(|(nutrient, apply, factor, pattern)| Refinement {
        nutrient,
        apply,
        factor,
        pattern: Regex::new(&format!("(?i){pattern}")).expect("refinement pattern"),
    })
    .collect()
});

/// Apply oxide overrides and fallbacks on top of the keyword pass.
pub(super) fn apply_refinements(text: &str, profile: &mut NutrientProfile) {
    for step in REFINEMENTS.iter() {
        if step.apply == Apply::IfUnset && !profile.is_unset(step.nutrient) {
            continue;
        }

        let Some(caps) = step.pattern.captures(text) else {
            continue;
        };

        let value = parse_percent(&caps[1]).map(|v| v * step.factor);
        match (step.apply, value) {
            (Apply::Override, value) => {
                let value = value.unwrap_or(0.0);
                debug!(nutrient = ?step.nutrient, value, "Oxide override");
                profile.set(step.nutrient, value);
            }
            (Apply::IfUnset, Some(value)) => {
                debug!(nutrient = ?step.nutrient, value, "Fallback pattern");
                profile.set(step.nutrient, value);
            }
            (Apply::IfUnset, None) => {}
        }
    }
}
