use crate::core::proximity::Located;
use crate::models::BloodType;

/// Attribute predicate applied to candidates independently of distance.
///
/// An entity that does not carry the tested attribute never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact blood group
    BloodType(BloodType),
    /// Case-insensitive substring of the city name (stored lowercased)
    CityContains(String),
    /// Donor availability flag
    Available(bool),
    /// Hospital blood-bank flag
    HasBloodBank(bool),
    /// Request is pending or in progress
    OpenRequest,
}

impl Predicate {
    /// City substring predicate, normalised for case-insensitive matching
    pub fn city_contains(needle: &str) -> Self {
        Predicate::CityContains(needle.trim().to_lowercase())
    }

    #[inline]
    pub fn matches<E: Located + ?Sized>(&self, entity: &E) -> bool {
        match self {
            Predicate::BloodType(wanted) => entity.blood_type() == Some(*wanted),
            Predicate::CityContains(needle) => entity
                .city()
                .map(|city| city.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false),
            Predicate::Available(wanted) => entity.is_available() == Some(*wanted),
            Predicate::HasBloodBank(wanted) => entity.has_blood_bank() == Some(*wanted),
            Predicate::OpenRequest => entity.status().map(|s| s.is_open()).unwrap_or(false),
        }
    }
}

/// Check an entity against every predicate (an empty list matches everything)
#[inline]
pub fn matches_all<E: Located + ?Sized>(entity: &E, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(entity))
}
