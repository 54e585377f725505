use actix_web::{web, HttpResponse};
use validator::Validate;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::core::check_eligibility;
use crate::error::ApiError;
use crate::models::{BecomeDonorRequest, CreateDonorRequest, DataResponse, Donor, UpdateDonorRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/donors", web::get().to(list_donors))
        .route("/donors", web::post().to(create_donor))
        .route("/donors/become", web::post().to(become_donor))
        .route("/donors/{id}", web::get().to(get_donor))
        .route("/donors/{id}", web::put().to(update_donor))
        .route("/donors/{id}", web::delete().to(delete_donor));
}

/// Contact details are only shown to signed-in callers
fn for_viewer(donor: Donor, viewer: &Option<AuthenticatedUser>) -> Donor {
    if viewer.is_some() {
        donor
    } else {
        donor.redacted()
    }
}

/// GET /api/donors
async fn list_donors(
    state: web::Data<AppState>,
    viewer: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let donors: Vec<Donor> = state
        .postgres
        .list_donors()
        .await?
        .into_iter()
        .map(|d| for_viewer(d, &viewer))
        .collect();

    Ok(HttpResponse::Ok().json(DataResponse::ok(donors)))
}

/// GET /api/donors/{id}
async fn get_donor(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    viewer: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let donor = state.postgres.get_donor(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(for_viewer(donor, &viewer))))
}

/// POST /api/donors
async fn create_donor(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateDonorRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let donor = state.postgres.create_donor(&req).await?;
    state.invalidate_nearby("donors").await;

    tracing::info!("User {} registered donor {}", user.user_id, donor.id);

    Ok(HttpResponse::Created().json(DataResponse::with_message(donor, "Donor registered successfully")))
}

/// PUT /api/donors/{id}
async fn update_donor(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<i64>,
    req: web::Json<UpdateDonorRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let donor = state.postgres.update_donor(id.into_inner(), &req).await?;
    state.invalidate_nearby("donors").await;

    Ok(HttpResponse::Ok().json(DataResponse::with_message(donor, "Donor updated successfully")))
}

/// DELETE /api/donors/{id}
async fn delete_donor(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();

    if !state.postgres.delete_donor(id).await? {
        return Err(ApiError::NotFound(format!("donor {}", id)));
    }
    state.invalidate_nearby("donors").await;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/donors/become
///
/// Signs the caller up as an available donor. Age and weight rules are
/// enforced here regardless of what the client checked.
async fn become_donor(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<BecomeDonorRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let today = chrono::Utc::now().date_naive();
    check_eligibility(req.date_of_birth, req.weight, today)?;

    let donor = state.postgres.become_donor(&user.user_id, &req).await?;
    state.invalidate_nearby("donors").await;

    Ok(HttpResponse::Created().json(DataResponse::with_message(
        donor,
        "Successfully registered as a donor",
    )))
}
