use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{BloodType, RequestStatus, UrgencyLevel};

/// Query string of every nearby-search endpoint.
///
/// Coordinates are optional at the type level so a missing value can be
/// reported as a field error instead of a generic parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NearbyParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub blood_type: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    pub has_blood_bank: Option<bool>,
}

/// Query string of the external places endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacesParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Query string of the dashboard endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Register a donor directly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDonorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub blood_type: BloodType,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Partial donor update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateDonorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub blood_type: Option<BloodType>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub is_available: Option<bool>,
    pub last_donation_date: Option<NaiveDate>,
}

/// Sign the authenticated user up as a donor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BecomeDonorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    pub blood_type: BloodType,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub date_of_birth: NaiveDate,
    pub weight: f64,
    #[validate(range(min = 0.0))]
    pub height: f64,
    pub last_donation_date: Option<NaiveDate>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[validate(length(min = 1))]
    pub medications: String,
    #[validate(custom(function = "must_accept"))]
    pub agreement: bool,
    #[validate(length(min = 1))]
    pub health_status: String,
}

fn must_accept(value: &bool) -> Result<(), ValidationError> {
    if *value {
        Ok(())
    } else {
        let mut err = ValidationError::new("accepted");
        err.message = Some("The agreement must be accepted".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateHospitalRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub description: Option<String>,
    pub has_blood_bank: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBloodRequestRequest {
    pub blood_type: BloodType,
    #[validate(range(min = 1))]
    pub units_needed: i32,
    #[validate(length(min = 1, max = 255))]
    pub hospital_name: String,
    #[validate(length(min = 1))]
    pub hospital_address: String,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub urgency_level: UrgencyLevel,
    #[validate(length(min = 1, max = 255))]
    pub patient_name: String,
    #[validate(length(min = 1, max = 20))]
    pub contact_phone: String,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBloodRequestRequest {
    pub status: Option<RequestStatus>,
    pub additional_notes: Option<String>,
}

/// Filters for the paginated blood request listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBloodRequestsParams {
    pub status: Option<RequestStatus>,
    pub blood_type: Option<String>,
    pub page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn become_donor() -> BecomeDonorRequest {
        BecomeDonorRequest {
            name: "Sita Poudel".to_string(),
            phone: "9846789012".to_string(),
            blood_type: BloodType::BPositive,
            city: "Pokhara".to_string(),
            address: "Birauta-17".to_string(),
            latitude: 28.2209,
            longitude: 83.9892,
            date_of_birth: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            weight: 58.0,
            height: 160.0,
            last_donation_date: None,
            medical_conditions: vec![],
            medications: "none".to_string(),
            agreement: true,
            health_status: "good".to_string(),
        }
    }

    #[test]
    fn test_become_donor_requires_agreement() {
        let mut req = become_donor();
        assert!(req.validate().is_ok());

        req.agreement = false;
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("agreement"));
    }

    #[test]
    fn test_create_donor_rejects_bad_coordinates() {
        let req = CreateDonorRequest {
            name: "Ram Sharma".to_string(),
            blood_type: BloodType::APositive,
            phone: "9846123456".to_string(),
            email: Some("not-an-email".to_string()),
            city: "Pokhara".to_string(),
            address: "Lakeside-6".to_string(),
            latitude: 95.0,
            longitude: 83.9634,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("latitude"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("longitude"));
    }

    #[test]
    fn test_nearby_params_city_length() {
        let params = NearbyParams {
            city: Some("x".repeat(256)),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_blood_request_body_parses() {
        let body = serde_json::json!({
            "blood_type": "O-",
            "units_needed": 2,
            "hospital_name": "Western Regional Hospital",
            "hospital_address": "Ramghat, Pokhara-10",
            "latitude": 28.2195,
            "longitude": 83.9856,
            "urgency_level": "critical",
            "patient_name": "Hari",
            "contact_phone": "061-520297"
        });

        let req: CreateBloodRequestRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.blood_type, BloodType::ONegative);
        assert_eq!(req.urgency_level, UrgencyLevel::Critical);
        assert!(req.city.is_none());
        assert!(req.validate().is_ok());
    }
}
