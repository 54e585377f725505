use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::proximity::Located;

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both components finite and inside [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Build from nullable columns
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid blood type '{0}', expected one of A+, A-, B+, B-, AB+, AB-, O+, O-")]
pub struct ParseBloodTypeError(pub String);

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "blood_type")]
pub enum BloodType {
    #[serde(rename = "A+")]
    #[sqlx(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    #[sqlx(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    #[sqlx(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    #[sqlx(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    #[sqlx(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    #[sqlx(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    #[sqlx(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    #[sqlx(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = ParseBloodTypeError;

    /// Case-insensitive. A trailing space stands for `+`, since an unencoded
    /// `+` in a query string arrives decoded as a space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start();
        let normalized = match trimmed.strip_suffix(' ') {
            Some(group) if !group.trim().is_empty() && !group.trim().ends_with(['+', '-']) => {
                format!("{}+", group.trim())
            }
            _ => trimmed.trim().to_string(),
        }
        .to_ascii_uppercase();

        BloodType::ALL
            .into_iter()
            .find(|bt| bt.as_str() == normalized)
            .ok_or_else(|| ParseBloodTypeError(s.to_string()))
    }
}

/// How soon a blood request must be fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "urgency_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle of a blood request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Still looking for donors
    pub fn is_open(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }
}

/// Registered blood donor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Donor {
    pub id: i64,
    pub name: String,
    pub blood_type: BloodType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: bool,
    pub last_donation_date: Option<NaiveDate>,
    pub total_donations: i32,
    #[serde(skip_serializing)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    /// Strip contact details for anonymous callers
    pub fn redacted(mut self) -> Self {
        self.phone = None;
        self.email = None;
        self.address = None;
        self
    }
}

impl Located for Donor {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    fn blood_type(&self) -> Option<BloodType> {
        Some(self.blood_type)
    }

    fn city(&self) -> Option<&str> {
        Some(&self.city)
    }

    fn is_available(&self) -> Option<bool> {
        Some(self.is_available)
    }
}

/// Medical details captured when a user signs up as a donor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonorProfile {
    pub donor_id: i64,
    pub date_of_birth: NaiveDate,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub medical_conditions: Vec<String>,
    pub medications: String,
    pub health_status: String,
}

/// Hospital, optionally with an attached blood bank
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub has_blood_bank: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Located for Hospital {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude, self.longitude))
    }

    fn city(&self) -> Option<&str> {
        Some(&self.city)
    }

    fn has_blood_bank(&self) -> Option<bool> {
        Some(self.has_blood_bank)
    }
}

/// A request for blood units at a hospital
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BloodRequest {
    pub id: i64,
    pub user_id: String,
    pub blood_type: BloodType,
    pub units_needed: i32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub urgency_level: UrgencyLevel,
    pub patient_name: String,
    pub contact_phone: String,
    pub additional_notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Located for BloodRequest {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude, self.longitude))
    }

    fn blood_type(&self) -> Option<BloodType> {
        Some(self.blood_type)
    }

    fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    fn status(&self) -> Option<RequestStatus> {
        Some(self.status)
    }
}

/// Place returned by the external places API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
}

impl Located for Place {
    fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude, self.longitude))
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
