use std::sync::LazyLock;

use regex::Regex;

/// Street-type spellings mapped to their canonical abbreviation. Order
/// matters: multi-word forms must be contracted before their components.
static STREET_TYPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bCOUNTY\s+(?:ROAD|RD)\.?(\s|,|$)", "CO RD$1"),
        (r"\bCO\.\s*RD\.?(\s|,|$)", "CO RD$1"),
        (r"\bSTREET\b", "ST"),
        (r"\bAVENUE\b", "AVE"),
        (r"\bROAD\b", "RD"),
        (r"\bDRIVE\b", "DR"),
        (r"\bCOURT\b", "CT"),
        (r"\bPLACE\b", "PL"),
        (r"\bBOULEVARD\b", "BLVD"),
        (r"\b(ST|AVE|RD|DR|CT|PL|BLVD)\.", "$1"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("street type pattern should be valid"),
            replacement,
        )
    })
    .collect()
});

/// The state only counts in state position: at the end of the address,
/// optionally followed by a ZIP code.
static STATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:,\s*|\s+)(?:WI|WISCONSIN)\.?(?:\s+(\d{5}(?:-\d{4})?))?\s*$")
        .expect("state pattern should be valid")
});

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims, collapses internal whitespace and upper-cases.
pub fn normalize_name(s: &str) -> String {
    collapse_whitespace(s).to_uppercase()
}

/// Canonical form of an address used as part of the mileage cache key.
///
/// Street types are contracted to a single abbreviation each and empty
/// comma segments are dropped. A trailing state token (with or without ZIP
/// code) is rendered as `, WI`; the same words elsewhere in the address are
/// left alone. Applying the function twice gives the same result as once.
pub fn normalize_address(s: &str) -> String {
    let mut address = normalize_name(s);
    if address.is_empty() {
        return address;
    }
    for (pattern, replacement) in STREET_TYPES.iter() {
        address = pattern.replace_all(&address, *replacement).into_owned();
    }
    let address = drop_empty_segments(&address);
    let address = STATE_TOKEN.replace(&address, ", WI ${1}");
    address.trim_end().to_string()
}

/// Re-joins comma-separated parts with uniform spacing, dropping empty ones
/// (doubled, leading and trailing commas).
fn drop_empty_segments(address: &str) -> String {
    address
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
