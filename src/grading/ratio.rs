// src/grading/ratio.rs

use super::{NutrientProfile, parse_percent};
use once_cell::sync::Lazy;
use regex::Regex;

const NUM: &str = r"(\d+(?:[.,]\d+)?)";

// Colon triples without an npk/np prefix are left out: "12:30:45" is a time.
static RATIO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 16-16-16
        format!(r"\b{NUM}\s*-\s*{NUM}\s*-\s*{NUM}\b"),
        // npk 10:10:10, npk(16:16:16), np(s) 20-20, npk 12,5:10:10
        format!(
            r"\b(?:npk|np)\s*(?:\([^)]+\))?\s*\(?\s*{NUM}\s*[:-]\s*{NUM}(?:\s*[:-]\s*{NUM})?"
        ),
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("ratio pattern"))
    .collect()
});

static WEIGHT_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*[кk][гg]").expect("weight unit pattern"));

/// Look for an explicit N-P-K ratio. The first pattern that matches wins;
/// the NP form leaves K at zero.
pub(super) fn match_ratio(text: &str) -> Option<NutrientProfile> {
    let caps = RATIO_PATTERNS.iter().find_map(|re| re.captures(text))?;
    let end = caps.get(0)?.end();
    let mut parts = [1, 2, 3].map(|i| caps.get(i).map(|m| m.as_str()));

    // "16:16:16,50 кг": the comma starts a packaging weight, not a decimal
    if WEIGHT_UNIT.is_match(&text[end..]) {
        if let Some(last) = parts.iter_mut().rev().find_map(|p| p.as_mut()) {
            let raw: &str = *last;
            *last = raw.split_once(',').map_or(raw, |(int_part, _)| int_part);
        }
    }

    Some(NutrientProfile {
        n: component(parts[0]),
        p: component(parts[1]),
        k: component(parts[2]),
        ca: 0.0,
    })
}

/// Values over 100 are not percentages and count as absent.
fn component(raw: Option<&str>) -> f64 {
    raw.and_then(parse_percent).unwrap_or(0.0)
}
