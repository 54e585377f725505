use actix_web::{web, HttpResponse};
use std::collections::BTreeMap;

use super::nearby::required_origin;
use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::core::{calculate_bounding_box, NearbyQuery, Predicate};
use crate::error::ApiError;
use crate::models::{ActivityItem, BloodRequest, DashboardParams, DashboardStats};

/// Each donation is counted as helping this many patients
pub const LIVES_PER_DONATION: i64 = 3;

/// Requests pulled into the activity feed
pub const RECENT_REQUESTS: i64 = 5;

/// Longest activity feed returned
pub const MAX_ACTIVITY_ITEMS: usize = 10;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/user/dashboard/stats", web::get().to(dashboard_stats))
        .route("/user/dashboard/activity", web::get().to(dashboard_activity));
}

/// GET /api/user/dashboard/stats?latitude=&longitude=
async fn dashboard_stats(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    params: web::Query<DashboardParams>,
) -> Result<HttpResponse, ApiError> {
    let mut errors = BTreeMap::new();
    let origin = match required_origin(params.latitude, params.longitude, &mut errors) {
        Some(origin) => origin,
        None => return Err(ApiError::Validation(errors)),
    };

    let radius_km = state.search.dashboard_radius_km;
    let filter = state.nearby_filter();
    let requests_query = NearbyQuery::new(origin, radius_km).with_predicate(Predicate::OpenRequest);
    let donors_query = NearbyQuery::new(origin, radius_km).with_predicate(Predicate::Available(true));
    filter.validate(&requests_query)?;

    let bbox = calculate_bounding_box(origin.latitude, origin.longitude, radius_km);

    let requests = state.postgres.open_requests_in_bounds(&bbox).await?;
    let donors = state.postgres.donors_in_bounds(&bbox, true).await?;
    let me = state.postgres.donor_for_user(&user.user_id).await?;

    let total_donations = me.as_ref().map(|d| i64::from(d.total_donations)).unwrap_or(0);

    let stats = DashboardStats {
        total_donations,
        last_donation_date: me.and_then(|d| d.last_donation_date),
        lives_impacted: total_donations * LIVES_PER_DONATION,
        nearby_requests: filter.count_nearby(&requests_query, &requests)?,
        nearby_donors: filter.count_nearby(&donors_query, &donors)?,
    };

    Ok(HttpResponse::Ok().json(stats))
}

/// GET /api/user/dashboard/activity
async fn dashboard_activity(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let requests = state
        .postgres
        .recent_requests_for_user(&user.user_id, RECENT_REQUESTS)
        .await?;

    tracing::debug!("Activity feed for {}: {} requests", user.user_id, requests.len());

    Ok(HttpResponse::Ok().json(activity_feed(&requests)))
}

/// Activity items, newest first
fn activity_feed(requests: &[BloodRequest]) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = requests.iter().map(ActivityItem::from).collect();
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.truncate(MAX_ACTIVITY_ITEMS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodType, RequestStatus, UrgencyLevel};
    use chrono::{Duration, Utc};

    fn request(id: i64, hours_ago: i64) -> BloodRequest {
        let created_at = Utc::now() - Duration::hours(hours_ago);
        BloodRequest {
            id,
            user_id: "user-1".to_string(),
            blood_type: BloodType::ONegative,
            units_needed: 3,
            hospital_name: "Manipal Teaching Hospital".to_string(),
            hospital_address: "Phulbari, Pokhara".to_string(),
            city: Some("Pokhara".to_string()),
            latitude: 28.2397,
            longitude: 83.9989,
            urgency_level: UrgencyLevel::Critical,
            patient_name: "Gita".to_string(),
            contact_phone: "061-526416".to_string(),
            additional_notes: None,
            status: RequestStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_activity_item_mapping() {
        let item = ActivityItem::from(&request(42, 1));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], 42);
        assert_eq!(json["type"], "request");
        assert_eq!(json["location"], "Manipal Teaching Hospital");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["details"]["blood_type"], serde_json::to_value(BloodType::ONegative).unwrap());
        assert_eq!(json["details"]["units"], 3);
        assert_eq!(json["details"]["hospital"], "Manipal Teaching Hospital");
        assert!(json["date"].is_string());
    }

    #[test]
    fn test_activity_feed_newest_first_and_capped() {
        let requests: Vec<BloodRequest> = (0..12).map(|i| request(i, 12 - i)).collect();
        let feed = activity_feed(&requests);

        assert_eq!(feed.len(), MAX_ACTIVITY_ITEMS);
        assert_eq!(feed[0].id, 11);
        assert!(feed.windows(2).all(|w| w[0].date >= w[1].date));
    }
}
