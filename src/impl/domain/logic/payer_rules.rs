use std::sync::LazyLock;

use regex::Regex;

use crate::{domain::logic::normalizer::normalize_name, entities::ExclusionReason};

// Service codes.
// ---

/// Per-mile trip code billed from the mileage detail group.
pub const MILEAGE_SERVICE_CODE: &str = "S0215";
/// Per-mile empty-leg code billed from the custom service codes field.
pub const DEAD_MILEAGE_SERVICE_CODE: &str = "T2049";

// Payers.
// ---

/// Payers that do not pay trip mileage for short trips.
pub const SHORT_TRIP_PAYERS: [&str; 2] = ["CC", "LCI"];
/// Trips resolving to fewer miles than this bill zero mileage to short-trip
/// payers.
pub const SHORT_TRIP_FLOOR_MILES: f64 = 5.0;

/// Payer billed for dead mileage regardless of distance.
pub const DEAD_MILEAGE_UNCONDITIONAL_PAYER: &str = "I";
/// Payers billed for dead mileage only at or above the threshold.
pub const DEAD_MILEAGE_THRESHOLD_PAYERS: [&str; 3] = ["MCW", "CC", "LCI"];
pub const DEAD_MILEAGE_THRESHOLD_MILES: f64 = 15.0;

/// Canonical payer for per-passenger recurring payment plans.
pub const RECURRING_PAYMENT_PAYER: &str = "RECURRING PAYMENT";

/// Authorizations numerically above this are generated placeholders.
pub const AUTHORIZATION_PLACEHOLDER_MIN: f64 = 1e15;

/// The export creates one payer per passenger for recurring payments, e.g.
/// `Recurring Payment - Doe, Jane`. They are billed as one payer.
static RECURRING_PAYMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^RECURRING\s+PAY(?:MENT)?\b").expect("recurring payment pattern should be valid")
});

// --

pub fn normalize_payer(payer: &str) -> String {
    let normalized = normalize_name(payer);
    if RECURRING_PAYMENT.is_match(&normalized) {
        RECURRING_PAYMENT_PAYER.to_string()
    } else {
        normalized
    }
}

/// Returns `None` for empty authorizations and numeric placeholders.
pub fn effective_authorization(raw: Option<&str>) -> Option<String> {
    let trimmed = raw.map(str::trim).filter(|a| !a.is_empty())?;
    match trimmed.parse::<f64>() {
        Ok(n) if n > AUTHORIZATION_PLACEHOLDER_MIN => None,
        _ => Some(trimmed.to_string()),
    }
}

/// Applies the short-trip floor to a mileage quantity. An operator override
/// always wins over the floor.
pub fn apply_short_trip_floor(normalized_payer: &str, quantity: f64, has_override: bool) -> f64 {
    if !has_override
        && SHORT_TRIP_PAYERS.contains(&normalized_payer)
        && quantity < SHORT_TRIP_FLOOR_MILES
    {
        0.0
    } else {
        quantity
    }
}

/// Decides whether a dead mileage quantity is billable. An operator override
/// always bills.
pub fn dead_mileage_eligibility(
    normalized_payer: &str,
    quantity: f64,
    has_override: bool,
) -> Result<(), ExclusionReason> {
    if has_override || normalized_payer == DEAD_MILEAGE_UNCONDITIONAL_PAYER {
        Ok(())
    } else if DEAD_MILEAGE_THRESHOLD_PAYERS.contains(&normalized_payer) {
        if quantity >= DEAD_MILEAGE_THRESHOLD_MILES {
            Ok(())
        } else {
            Err(ExclusionReason::DeadMileageBelowThreshold)
        }
    } else {
        Err(ExclusionReason::DeadMileagePayerNotEligible)
    }
}
