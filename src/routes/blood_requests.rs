use actix_web::{web, HttpResponse};
use validator::Validate;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    BloodRequest, BloodType, CreateBloodRequestRequest, DataResponse, ListBloodRequestsParams,
    Paginated, UpdateBloodRequestRequest,
};
use crate::services::REQUESTS_PER_PAGE;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/blood-requests", web::get().to(list_requests))
        .route("/blood-requests", web::post().to(create_request))
        .route("/blood-requests/{id}", web::get().to(get_request))
        .route("/blood-requests/{id}", web::put().to(update_request))
        .route("/blood-requests/{id}", web::delete().to(delete_request));
}

/// GET /api/blood-requests?status=&blood_type=&page=
async fn list_requests(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    params: web::Query<ListBloodRequestsParams>,
) -> Result<HttpResponse, ApiError> {
    let blood_type = match params.blood_type.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<BloodType>()
                .map_err(|e| ApiError::field("blood_type", e.to_string()))?,
        ),
        None => None,
    };
    let page = params.page.unwrap_or(1).max(1);

    let (data, total) = state.postgres.list_requests(params.status, blood_type, page).await?;

    Ok(HttpResponse::Ok().json(Paginated {
        data,
        current_page: page,
        per_page: REQUESTS_PER_PAGE,
        total,
    }))
}

/// POST /api/blood-requests
async fn create_request(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<CreateBloodRequestRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let request = state.postgres.create_request(&user.user_id, &req).await?;
    state.invalidate_nearby("requests").await;

    Ok(HttpResponse::Created().json(DataResponse::with_message(
        request,
        "Blood request created successfully",
    )))
}

/// GET /api/blood-requests/{id}
async fn get_request(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let request = state.postgres.get_request(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(request)))
}

/// PUT /api/blood-requests/{id}: owner only
async fn update_request(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<i64>,
    req: web::Json<UpdateBloodRequestRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let id = id.into_inner();

    ensure_owner(&state.postgres.get_request(id).await?, &user)?;

    let request = state.postgres.update_request(id, &req).await?;
    state.invalidate_nearby("requests").await;

    Ok(HttpResponse::Ok().json(DataResponse::with_message(
        request,
        "Blood request updated successfully",
    )))
}

/// DELETE /api/blood-requests/{id}: owner only
async fn delete_request(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();

    ensure_owner(&state.postgres.get_request(id).await?, &user)?;

    if !state.postgres.delete_request(id).await? {
        return Err(ApiError::NotFound(format!("blood request {}", id)));
    }
    state.invalidate_nearby("requests").await;

    Ok(HttpResponse::NoContent().finish())
}

fn ensure_owner(request: &BloodRequest, user: &AuthenticatedUser) -> Result<(), ApiError> {
    if request.user_id == user.user_id {
        Ok(())
    } else {
        tracing::info!(
            "User {} tried to modify blood request {} owned by {}",
            user.user_id,
            request.id,
            request.user_id
        );
        Err(ApiError::Forbidden("only the requester can modify this request".to_string()))
    }
}
