//! Donor Locator - nearby search for blood donors, hospitals and blood requests
//!
//! The heart of the crate is [`core::ProximityFilter`], a pure radius filter
//! over anything implementing [`core::Located`]. The HTTP service around it
//! loads candidates from PostgreSQL with a bounding-box pre-filter, runs the
//! filter and caches the rendered responses.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance, planar_distance},
    DistanceMode, Located, Nearby, NearbyQuery, Predicate, ProximityError, ProximityFilter,
};
pub use crate::error::ApiError;
pub use crate::models::{BloodRequest, BloodType, Coordinates, Donor, Hospital, Place};
