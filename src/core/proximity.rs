use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::core::distance::DistanceMode;
use crate::core::filters::{matches_all, Predicate};
use crate::models::{BloodType, Coordinates, RequestStatus};

/// Errors raised by the proximity filter. Always caused by the caller's input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProximityError {
    #[error("invalid {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },
}

impl ProximityError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ProximityError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending input
    pub fn field(&self) -> &'static str {
        match self {
            ProximityError::InvalidArgument { field, .. } => field,
        }
    }
}

/// A record that can be placed on the map.
///
/// Only `coordinates` is required; the attribute accessors back the
/// [`Predicate`]s and default to "not carried".
pub trait Located {
    fn coordinates(&self) -> Option<Coordinates>;

    fn blood_type(&self) -> Option<BloodType> {
        None
    }

    fn city(&self) -> Option<&str> {
        None
    }

    fn is_available(&self) -> Option<bool> {
        None
    }

    fn has_blood_bank(&self) -> Option<bool> {
        None
    }

    fn status(&self) -> Option<RequestStatus> {
        None
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn coordinates(&self) -> Option<Coordinates> {
        (**self).coordinates()
    }

    fn blood_type(&self) -> Option<BloodType> {
        (**self).blood_type()
    }

    fn city(&self) -> Option<&str> {
        (**self).city()
    }

    fn is_available(&self) -> Option<bool> {
        (**self).is_available()
    }

    fn has_blood_bank(&self) -> Option<bool> {
        (**self).has_blood_bank()
    }

    fn status(&self) -> Option<RequestStatus> {
        (**self).status()
    }
}

/// An entity found within the search radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nearby<E> {
    #[serde(flatten)]
    pub entity: E,
    #[serde(rename = "distance", serialize_with = "serialize_rounded_km")]
    pub distance_km: f64,
}

/// Display rounding only; the filter itself compares unrounded distances
fn serialize_rounded_km<S: Serializer>(km: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_one_decimal(*km))
}

#[inline]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Radius search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub origin: Coordinates,
    pub radius_km: f64,
    pub predicates: Vec<Predicate>,
}

impl NearbyQuery {
    pub fn new(origin: Coordinates, radius_km: f64) -> Self {
        Self {
            origin,
            radius_km,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// Radius filter over any collection of [`Located`] records.
///
/// Stateless and pure: no I/O, no shared mutable state, safe to call from any
/// number of workers at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityFilter {
    mode: DistanceMode,
    max_radius_km: f64,
}

impl ProximityFilter {
    pub fn new(mode: DistanceMode, max_radius_km: f64) -> Self {
        Self {
            mode,
            max_radius_km,
        }
    }

    pub fn mode(&self) -> DistanceMode {
        self.mode
    }

    pub fn max_radius_km(&self) -> f64 {
        self.max_radius_km
    }

    /// Same distance mode with a different radius ceiling
    pub fn with_max_radius(self, max_radius_km: f64) -> Self {
        Self {
            max_radius_km,
            ..self
        }
    }

    /// Reject out-of-range origins and radii instead of clamping them
    pub fn validate(&self, query: &NearbyQuery) -> Result<(), ProximityError> {
        let origin = query.origin;

        if !origin.latitude.is_finite() || !(-90.0..=90.0).contains(&origin.latitude) {
            return Err(ProximityError::invalid(
                "latitude",
                format!("must be between -90 and 90, got {}", origin.latitude),
            ));
        }

        if !origin.longitude.is_finite() || !(-180.0..=180.0).contains(&origin.longitude) {
            return Err(ProximityError::invalid(
                "longitude",
                format!("must be between -180 and 180, got {}", origin.longitude),
            ));
        }

        if !query.radius_km.is_finite() || query.radius_km <= 0.0 {
            return Err(ProximityError::invalid(
                "radius",
                format!("must be greater than 0, got {}", query.radius_km),
            ));
        }

        if query.radius_km > self.max_radius_km {
            return Err(ProximityError::invalid(
                "radius",
                format!(
                    "must not be greater than {}, got {}",
                    self.max_radius_km, query.radius_km
                ),
            ));
        }

        Ok(())
    }

    /// Find every candidate within the radius, nearest first.
    ///
    /// Candidates without usable coordinates are skipped. Ties keep the order
    /// in which candidates were supplied.
    pub fn find_nearby<I, E>(
        &self,
        query: &NearbyQuery,
        candidates: I,
    ) -> Result<Vec<Nearby<E>>, ProximityError>
    where
        I: IntoIterator<Item = E>,
        E: Located,
    {
        self.validate(query)?;

        let mut hits: Vec<Nearby<E>> = candidates
            .into_iter()
            .filter(|entity| matches_all(entity, &query.predicates))
            .filter_map(|entity| {
                let at = entity.coordinates().filter(Coordinates::is_valid)?;
                let distance_km = self.mode.distance(query.origin, at);

                (distance_km <= query.radius_km).then_some(Nearby {
                    entity,
                    distance_km,
                })
            })
            .collect();

        // sort_by is stable, which gives the insertion-order tie break
        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        Ok(hits)
    }

    /// Number of candidates [`find_nearby`](Self::find_nearby) would return
    pub fn count_nearby<I, E>(&self, query: &NearbyQuery, candidates: I) -> Result<usize, ProximityError>
    where
        I: IntoIterator<Item = E>,
        E: Located,
    {
        self.validate(query)?;

        Ok(candidates
            .into_iter()
            .filter(|entity| matches_all(entity, &query.predicates))
            .filter_map(|entity| entity.coordinates().filter(Coordinates::is_valid))
            .filter(|at| self.mode.distance(query.origin, *at) <= query.radius_km)
            .count())
    }
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(DistanceMode::Haversine, 100.0)
    }
}
