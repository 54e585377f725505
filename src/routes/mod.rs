// Route exports
pub mod blood_requests;
pub mod dashboard;
pub mod donors;
pub mod hospitals;
pub mod nearby;
pub mod places;

use actix_web::{error, web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::config::SearchSettings;
use crate::core::ProximityFilter;
use crate::error::ApiError;
use crate::models::HealthResponse;
use crate::services::{CacheKey, CacheManager, PlacesClient, PostgresClient};

/// Radius ceiling of the external places lookups
pub const PLACES_MAX_RADIUS_KM: f64 = 50.0;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub cache: Arc<CacheManager>,
    /// None when no places API key is configured
    pub places: Option<Arc<PlacesClient>>,
    pub auth: Arc<JwtVerifier>,
    pub search: SearchSettings,
}

impl AppState {
    /// Filter for the `/{kind}/nearby` endpoints
    pub fn nearby_filter(&self) -> ProximityFilter {
        ProximityFilter::new(self.search.distance_mode, self.search.max_radius_km)
    }

    /// Filter for the `/locations/{kind}` endpoints
    pub fn locations_filter(&self) -> ProximityFilter {
        self.nearby_filter()
            .with_max_radius(self.search.locations_max_radius_km)
    }

    pub fn places_filter(&self) -> ProximityFilter {
        self.nearby_filter().with_max_radius(PLACES_MAX_RADIUS_KM)
    }

    /// Drop cached nearby searches over one store. Failures are only logged.
    pub async fn invalidate_nearby(&self, store: &str) {
        if let Err(e) = self
            .cache
            .invalidate_pattern(&CacheKey::nearby_pattern(store))
            .await
        {
            tracing::warn!("Failed to invalidate cached {} searches: {}", store, e);
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Nearby routes go first so `/donors/nearby` is not taken for `/donors/{id}`
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            .configure(nearby::configure)
            .configure(places::configure)
            .configure(donors::configure)
            .configure(hospitals::configure)
            .configure(blood_requests::configure)
            .configure(dashboard::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        distance_mode: state.search.distance_mode,
        timestamp: chrono::Utc::now(),
    })
}

/// JSON extractor config: shape errors are 422, unreadable bodies 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

/// Query extractor config: unparsable parameters are 422
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handle_query_payload_error)
}

fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);

    match &err {
        error::JsonPayloadError::Deserialize(e) if e.is_data() => {
            ApiError::field("body", e.to_string()).into()
        }
        _ => ApiError::BadRequest(format!("Invalid JSON: {}", err)).into(),
    }
}

fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    ApiError::field("query", err.to_string()).into()
}
