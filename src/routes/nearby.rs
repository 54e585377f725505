use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::core::{calculate_bounding_box, Located, NearbyQuery, Predicate, ProximityFilter};
use crate::error::{validation_messages, ApiError};
use crate::models::{BloodType, Coordinates, Donor, NearbyParams, NearbyResponse};
use crate::services::{CacheError, CacheKey};

/// Entity kinds that can be searched by radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Donors,
    Hospitals,
    BloodBanks,
    Requests,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Donors => "donors",
            EntityKind::Hospitals => "hospitals",
            EntityKind::BloodBanks => "blood-banks",
            EntityKind::Requests => "requests",
        }
    }

    /// Table the candidates come from; blood banks are hospitals
    pub fn store(self) -> &'static str {
        match self {
            EntityKind::Donors => "donors",
            EntityKind::Hospitals | EntityKind::BloodBanks => "hospitals",
            EntityKind::Requests => "requests",
        }
    }
}

/// Longest `city` filter accepted by the locations endpoints
pub const LOCATIONS_CITY_MAX_CHARS: usize = 100;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/donors/nearby", web::get().to(nearby_donors))
        .route("/hospitals/nearby", web::get().to(nearby_hospitals))
        .route("/blood-banks/nearby", web::get().to(nearby_blood_banks))
        .route("/requests/nearby", web::get().to(nearby_requests))
        .route("/locations/{kind}", web::get().to(locations));
}

/// GET /api/donors/nearby?latitude=&longitude=&radius=&blood_type=&city=
async fn nearby_donors(
    state: web::Data<AppState>,
    params: web::Query<NearbyParams>,
    viewer: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let filter = state.nearby_filter();
    search(&state, params.into_inner(), EntityKind::Donors, filter, viewer).await
}

/// GET /api/hospitals/nearby?latitude=&longitude=&radius=&has_blood_bank=&city=
async fn nearby_hospitals(
    state: web::Data<AppState>,
    params: web::Query<NearbyParams>,
) -> Result<HttpResponse, ApiError> {
    let filter = state.nearby_filter();
    search(&state, params.into_inner(), EntityKind::Hospitals, filter, None).await
}

/// GET /api/blood-banks/nearby?latitude=&longitude=&radius=&city=
async fn nearby_blood_banks(
    state: web::Data<AppState>,
    params: web::Query<NearbyParams>,
) -> Result<HttpResponse, ApiError> {
    let filter = state.nearby_filter();
    search(&state, params.into_inner(), EntityKind::BloodBanks, filter, None).await
}

/// GET /api/requests/nearby?latitude=&longitude=&radius=&blood_type=&city=
async fn nearby_requests(
    state: web::Data<AppState>,
    params: web::Query<NearbyParams>,
) -> Result<HttpResponse, ApiError> {
    let filter = state.nearby_filter();
    search(&state, params.into_inner(), EntityKind::Requests, filter, None).await
}

/// GET /api/locations/{kind}: same search with the tighter locations ceiling
async fn locations(
    state: web::Data<AppState>,
    kind: web::Path<EntityKind>,
    params: web::Query<NearbyParams>,
    viewer: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    check_locations_city(&params)?;
    let filter = state.locations_filter();
    search(&state, params.into_inner(), kind.into_inner(), filter, viewer).await
}

fn check_locations_city(params: &NearbyParams) -> Result<(), ApiError> {
    match &params.city {
        Some(city) if city.chars().count() > LOCATIONS_CITY_MAX_CHARS => Err(ApiError::field(
            "city",
            format!("The city may not be greater than {} characters.", LOCATIONS_CITY_MAX_CHARS),
        )),
        _ => Ok(()),
    }
}

async fn search(
    state: &AppState,
    params: NearbyParams,
    kind: EntityKind,
    filter: ProximityFilter,
    viewer: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let query = build_query(&params, kind, state.search.default_radius_km)?;
    filter.validate(&query)?;

    let redact = kind == EntityKind::Donors && viewer.is_none();
    let key = CacheKey::nearby(
        kind.store(),
        &format!(
            "{}:{}:{}",
            kind.as_str(),
            if redact { "public" } else { "full" },
            fingerprint(&query)
        ),
    );

    match state.cache.get::<serde_json::Value>(&key).await {
        Ok(cached) => return Ok(HttpResponse::Ok().json(cached)),
        Err(CacheError::CacheMiss(_)) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
    }

    let origin = query.origin;
    let bbox = calculate_bounding_box(origin.latitude, origin.longitude, query.radius_km);

    let (count, body) = match kind {
        EntityKind::Donors => {
            let donors = state.postgres.donors_in_bounds(&bbox, true).await?;
            let donors: Vec<Donor> = if redact {
                donors.into_iter().map(Donor::redacted).collect()
            } else {
                donors
            };
            render(&filter, &query, donors)?
        }
        EntityKind::Hospitals | EntityKind::BloodBanks => {
            render(&filter, &query, state.postgres.hospitals_in_bounds(&bbox).await?)?
        }
        EntityKind::Requests => {
            render(&filter, &query, state.postgres.open_requests_in_bounds(&bbox).await?)?
        }
    };

    tracing::info!(
        "Nearby {} at ({:.4}, {:.4}) within {}km: {} results",
        kind.as_str(),
        origin.latitude,
        origin.longitude,
        query.radius_km,
        count
    );

    if let Err(e) = state.cache.set(&key, &body).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }

    Ok(HttpResponse::Ok().json(body))
}

/// Run the filter and render the response body
pub(crate) fn render<E: Located + Serialize>(
    filter: &ProximityFilter,
    query: &NearbyQuery,
    candidates: Vec<E>,
) -> Result<(usize, serde_json::Value), ApiError> {
    let hits = filter.find_nearby(query, candidates)?;
    let response = NearbyResponse::new(hits, query.radius_km, filter.mode());
    Ok((response.count, serde_json::to_value(&response)?))
}

/// Turn query parameters into a filter query.
///
/// Missing coordinates and malformed filters are reported together as field
/// errors. Range checks on the origin and radius are left to the filter.
pub fn build_query(
    params: &NearbyParams,
    kind: EntityKind,
    default_radius_km: f64,
) -> Result<NearbyQuery, ApiError> {
    let mut errors: BTreeMap<String, Vec<String>> = match params.validate() {
        Ok(()) => BTreeMap::new(),
        Err(e) => validation_messages(&e),
    };

    let origin = required_origin(params.latitude, params.longitude, &mut errors);

    let blood_type = match (&params.blood_type, kind) {
        (Some(raw), EntityKind::Donors | EntityKind::Requests) if !raw.is_empty() => {
            match raw.parse::<BloodType>() {
                Ok(bt) => Some(bt),
                Err(e) => {
                    errors.entry("blood_type".to_string()).or_default().push(e.to_string());
                    None
                }
            }
        }
        _ => None,
    };

    let origin = match origin {
        Some(origin) if errors.is_empty() => origin,
        _ => return Err(ApiError::Validation(errors)),
    };

    let mut query = NearbyQuery::new(origin, params.radius.unwrap_or(default_radius_km));

    query = match kind {
        EntityKind::Donors => query.with_predicate(Predicate::Available(true)),
        EntityKind::Hospitals => match params.has_blood_bank {
            Some(flag) => query.with_predicate(Predicate::HasBloodBank(flag)),
            None => query,
        },
        EntityKind::BloodBanks => query.with_predicate(Predicate::HasBloodBank(true)),
        EntityKind::Requests => query.with_predicate(Predicate::OpenRequest),
    };

    if let Some(bt) = blood_type {
        query = query.with_predicate(Predicate::BloodType(bt));
    }

    if let Some(city) = params.city.as_deref().filter(|c| !c.trim().is_empty()) {
        query = query.with_predicate(Predicate::city_contains(city.trim()));
    }

    Ok(query)
}

/// Both coordinates, or a "required" error for each missing one
pub(crate) fn required_origin(
    latitude: Option<f64>,
    longitude: Option<f64>,
    errors: &mut BTreeMap<String, Vec<String>>,
) -> Option<Coordinates> {
    for (field, value) in [("latitude", latitude), ("longitude", longitude)] {
        if value.is_none() {
            errors
                .entry(field.to_string())
                .or_default()
                .push(format!("The {} field is required.", field));
        }
    }

    Some(Coordinates::new(latitude?, longitude?))
}

/// Stable cache fingerprint of a query.
///
/// Coordinates use the shortest round-trip form, so distinct origins never
/// share a key.
pub(crate) fn fingerprint(query: &NearbyQuery) -> String {
    format!(
        "{}:{}:{}:{:?}",
        query.origin.latitude, query.origin.longitude, query.radius_km, query.predicates
    )
}
