use actix_web::{web, HttpResponse};
use validator::Validate;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{CreateHospitalRequest, DataResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/hospitals", web::post().to(create_hospital))
        .route("/hospitals/seed", web::post().to(seed_hospitals));
}

/// POST /api/hospitals
async fn create_hospital(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    req: web::Json<CreateHospitalRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let hospital = state.postgres.create_hospital(&req).await?;
    state.invalidate_nearby("hospitals").await;

    Ok(HttpResponse::Created().json(DataResponse::with_message(hospital, "Hospital created successfully")))
}

/// POST /api/hospitals/seed: load the built-in Pokhara hospital list
async fn seed_hospitals(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let inserted = state.postgres.insert_hospitals(&pokhara_hospitals()).await?;
    state.invalidate_nearby("hospitals").await;

    tracing::info!("User {} seeded {} hospitals", user.user_id, inserted);

    Ok(HttpResponse::Created().json(DataResponse::with_message(
        serde_json::json!({ "inserted": inserted }),
        "Hospitals seeded successfully",
    )))
}

#[allow(clippy::too_many_arguments)]
fn hospital(
    name: &str,
    phone: &str,
    email: &str,
    address: &str,
    latitude: f64,
    longitude: f64,
    description: &str,
    has_blood_bank: bool,
) -> CreateHospitalRequest {
    CreateHospitalRequest {
        name: name.to_string(),
        phone: phone.to_string(),
        email: Some(email.to_string()),
        city: "Pokhara".to_string(),
        address: address.to_string(),
        latitude,
        longitude,
        description: Some(description.to_string()),
        has_blood_bank,
    }
}

pub fn pokhara_hospitals() -> Vec<CreateHospitalRequest> {
    vec![
        hospital(
            "Manipal Teaching Hospital",
            "061-526416",
            "info@manipal.edu.np",
            "Phulbari, Pokhara-11",
            28.2397,
            83.9989,
            "Major teaching hospital with blood bank facilities",
            true,
        ),
        hospital(
            "Western Regional Hospital",
            "061-520297",
            "info@wrhp.gov.np",
            "Ramghat, Pokhara-10",
            28.2195,
            83.9856,
            "Government regional hospital with emergency services",
            true,
        ),
        hospital(
            "Gandaki Medical College",
            "061-538595",
            "info@gmc.edu.np",
            "Prithvi Chowk, Pokhara-8",
            28.2341,
            83.9845,
            "Teaching hospital with modern facilities",
            true,
        ),
        hospital(
            "Metro City Hospital",
            "061-523695",
            "info@metrocity.com.np",
            "Birauta, Pokhara-17",
            28.2209,
            83.9892,
            "Private hospital with modern facilities",
            false,
        ),
        hospital(
            "Fewa City Hospital",
            "061-524477",
            "info@fewacity.com.np",
            "Lakeside, Pokhara-6",
            28.2132,
            83.9634,
            "Private hospital near Fewa Lake",
            false,
        ),
    ]
}
