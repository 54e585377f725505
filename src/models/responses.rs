use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{DistanceMode, Nearby};
use crate::models::domain::{BloodRequest, BloodType, RequestStatus};

/// Response for the nearby-search endpoints
#[derive(Debug, Clone, Serialize)]
pub struct NearbyResponse<E> {
    pub success: bool,
    pub data: Vec<Nearby<E>>,
    pub count: usize,
    pub radius: f64,
    pub distance_mode: DistanceMode,
}

impl<E> NearbyResponse<E> {
    pub fn new(data: Vec<Nearby<E>>, radius: f64, distance_mode: DistanceMode) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
            radius,
            distance_mode,
        }
    }
}

/// Generic envelope for single-entity responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub distance_mode: DistanceMode,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Field-level validation failures (HTTP 422)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub errors: BTreeMap<String, Vec<String>>,
}

/// Dashboard summary for the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_donations: i64,
    pub last_donation_date: Option<NaiveDate>,
    pub lives_impacted: i64,
    pub nearby_requests: usize,
    pub nearby_donors: usize,
}

/// Source of an activity feed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Request,
}

/// Entry of the authenticated user's activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub location: String,
    pub date: DateTime<Utc>,
    pub status: RequestStatus,
    pub details: ActivityDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub blood_type: BloodType,
    pub units: i32,
    pub hospital: String,
}

impl From<&BloodRequest> for ActivityItem {
    fn from(request: &BloodRequest) -> Self {
        Self {
            id: request.id,
            kind: ActivityKind::Request,
            location: request.hospital_name.clone(),
            date: request.created_at,
            status: request.status,
            details: ActivityDetails {
                blood_type: request.blood_type,
                units: request.units_needed,
                hospital: request.hospital_name.clone(),
            },
        }
    }
}
