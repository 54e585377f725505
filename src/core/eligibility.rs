use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Minimum donor age in full years
pub const MIN_DONOR_AGE_YEARS: u32 = 18;

/// Minimum donor body weight in kilograms
pub const MIN_DONOR_WEIGHT_KG: f64 = 50.0;

/// Field-level reasons a person cannot register as a donor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityErrors {
    pub fields: BTreeMap<&'static str, Vec<String>>,
}

impl EligibilityErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Full years elapsed between `date_of_birth` and `today`.
/// Returns `None` for birth dates in the future.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(date_of_birth)
}

/// Single source of truth for the donor age and weight rules.
///
/// `today` is passed in so callers (and tests) control the clock.
pub fn check_eligibility(
    date_of_birth: NaiveDate,
    weight_kg: f64,
    today: NaiveDate,
) -> Result<(), EligibilityErrors> {
    let mut errors = EligibilityErrors::default();

    match age_in_years(date_of_birth, today) {
        Some(age) if age >= MIN_DONOR_AGE_YEARS => {}
        Some(_) => errors.push(
            "date_of_birth",
            format!(
                "You must be at least {} years old to become a donor",
                MIN_DONOR_AGE_YEARS
            ),
        ),
        None => errors.push("date_of_birth", "Date of birth cannot be in the future"),
    }

    if !weight_kg.is_finite() || weight_kg < MIN_DONOR_WEIGHT_KG {
        errors.push(
            "weight",
            format!(
                "You must weigh at least {}kg to become a donor",
                MIN_DONOR_WEIGHT_KG
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(
            "Donor eligibility failed for birth year {}: {:?}",
            date_of_birth.year(),
            errors.fields.keys().collect::<Vec<_>>()
        );
        Err(errors)
    }
}
