use actix_web::{web, HttpResponse};
use std::collections::BTreeMap;

use super::nearby::{fingerprint, render, required_origin};
use super::AppState;
use crate::core::{calculate_bounding_box, is_within_bounding_box, NearbyQuery};
use crate::error::ApiError;
use crate::models::{Place, PlacesParams};
use crate::services::{CacheError, CacheKey};

/// Radius used when the caller gives none
pub const DEFAULT_PLACES_RADIUS_KM: f64 = 5.0;

const MIN_PLACES_RADIUS_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceKind {
    Hospitals,
    BloodBanks,
}

impl PlaceKind {
    fn as_str(self) -> &'static str {
        match self {
            PlaceKind::Hospitals => "hospitals",
            PlaceKind::BloodBanks => "blood-banks",
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/places/hospitals", web::get().to(place_hospitals))
        .route("/places/blood-banks", web::get().to(place_blood_banks));
}

/// GET /api/places/hospitals?latitude=&longitude=&radius=
async fn place_hospitals(
    state: web::Data<AppState>,
    params: web::Query<PlacesParams>,
) -> Result<HttpResponse, ApiError> {
    lookup(&state, &params, PlaceKind::Hospitals).await
}

/// GET /api/places/blood-banks?latitude=&longitude=&radius=
async fn place_blood_banks(
    state: web::Data<AppState>,
    params: web::Query<PlacesParams>,
) -> Result<HttpResponse, ApiError> {
    lookup(&state, &params, PlaceKind::BloodBanks).await
}

async fn lookup(state: &AppState, params: &PlacesParams, kind: PlaceKind) -> Result<HttpResponse, ApiError> {
    let query = places_query(params)?;
    let filter = state.places_filter();
    filter.validate(&query)?;

    let client = state.places.as_ref().ok_or(ApiError::PlacesDisabled)?;

    let key = CacheKey::places(kind.as_str(), &fingerprint(&query));
    match state.cache.get::<serde_json::Value>(&key).await {
        Ok(cached) => return Ok(HttpResponse::Ok().json(cached)),
        Err(CacheError::CacheMiss(_)) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
    }

    let places = match kind {
        PlaceKind::Hospitals => client.nearby_hospitals(query.origin, query.radius_km).await?,
        PlaceKind::BloodBanks => client.nearby_blood_banks(query.origin, query.radius_km).await?,
    };
    let fetched = places.len();
    let places = inside_search_box(&query, places);

    // The API treats radius as a hint; the filter enforces it and orders by distance
    let (count, body) = render(&filter, &query, places)?;

    tracing::info!(
        "Places {} lookup within {}km: {} of {} results kept",
        kind.as_str(),
        query.radius_km,
        count,
        fetched
    );

    if let Err(e) = state.cache.set(&key, &body).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }

    Ok(HttpResponse::Ok().json(body))
}

/// Drop places outside the query's bounding box, as the SQL lookups do
fn inside_search_box(query: &NearbyQuery, places: Vec<Place>) -> Vec<Place> {
    let bbox = calculate_bounding_box(query.origin.latitude, query.origin.longitude, query.radius_km);
    places
        .into_iter()
        .filter(|p| is_within_bounding_box(p.latitude, p.longitude, &bbox))
        .collect()
}

fn places_query(params: &PlacesParams) -> Result<NearbyQuery, ApiError> {
    let mut errors = BTreeMap::new();
    let origin = required_origin(params.latitude, params.longitude, &mut errors);

    let radius_km = params.radius.unwrap_or(DEFAULT_PLACES_RADIUS_KM);
    if radius_km < MIN_PLACES_RADIUS_KM {
        errors
            .entry("radius".to_string())
            .or_default()
            .push(format!("must be at least {}, got {}", MIN_PLACES_RADIUS_KM, radius_km));
    }

    match origin {
        Some(origin) if errors.is_empty() => Ok(NearbyQuery::new(origin, radius_km)),
        _ => Err(ApiError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_places_query_defaults() {
        let params = PlacesParams {
            latitude: Some(28.2132),
            longitude: Some(83.9634),
            radius: None,
        };
        let query = places_query(&params).unwrap();
        assert_eq!(query.radius_km, DEFAULT_PLACES_RADIUS_KM);
    }

    fn place(id: &str, latitude: f64, longitude: f64) -> Place {
        Place {
            place_id: id.to_string(),
            name: id.to_string(),
            address: String::new(),
            latitude,
            longitude,
            rating: None,
        }
    }

    #[test]
    fn test_inside_search_box_drops_far_results() {
        let query = NearbyQuery::new(crate::models::Coordinates::new(28.2132, 83.9634), 10.0);
        let kept = inside_search_box(
            &query,
            vec![
                place("kathmandu", 27.7041, 85.3131),
                place("manipal", 28.2397, 83.9989),
                place("wrh", 28.2195, 83.9856),
            ],
        );
        let ids: Vec<&str> = kept.iter().map(|p| p.place_id.as_str()).collect();
        assert_eq!(ids, vec!["manipal", "wrh"]);
    }

    #[test]
    fn test_places_query_rejects_small_radius() {
        let params = PlacesParams {
            latitude: Some(28.2132),
            longitude: Some(83.9634),
            radius: Some(0.5),
        };
        match places_query(&params) {
            Err(ApiError::Validation(map)) => assert!(map.contains_key("radius")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
