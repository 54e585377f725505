use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::{EligibilityErrors, ProximityError};
use crate::models::{ErrorResponse, ValidationErrorResponse};
use crate::services::{PlacesError, PostgresError};

/// Errors surfaced by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("places lookup is not configured")]
    PlacesDisabled,

    #[error(transparent)]
    Database(#[from] PostgresError),

    #[error(transparent)]
    Places(#[from] PlacesError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::PlacesDisabled => "places_disabled",
            ApiError::Database(PostgresError::NotFound(_)) => "not_found",
            ApiError::Database(PostgresError::Conflict(_)) => "conflict",
            ApiError::Database(_) => "database_error",
            ApiError::Places(_) => "places_error",
            ApiError::Serialization(_) => "internal_error",
        }
    }
}

impl From<ProximityError> for ApiError {
    fn from(err: ProximityError) -> Self {
        match &err {
            ProximityError::InvalidArgument { field, message } => ApiError::field(*field, message.clone()),
        }
    }
}

impl From<EligibilityErrors> for ApiError {
    fn from(err: EligibilityErrors) -> Self {
        ApiError::Validation(
            err.fields
                .into_iter()
                .map(|(field, messages)| (field.to_string(), messages))
                .collect(),
        )
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(validation_messages(&err))
    }
}

/// Flatten validator output into `field -> [messages]`
pub fn validation_messages(err: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    err.field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let field = field.to_string();
            let messages = errors
                .iter()
                .map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("The {} field is invalid ({})", field, e.code),
                })
                .collect();
            (field, messages)
        })
        .collect()
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PlacesDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(PostgresError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Database(PostgresError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Places(_) => StatusCode::BAD_GATEWAY,
            ApiError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if let ApiError::Validation(errors) = self {
            return HttpResponse::build(status).json(ValidationErrorResponse {
                errors: errors.clone(),
            });
        }

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        // Internal details stay in the logs
        let message = match self {
            ApiError::Database(PostgresError::SqlxError(_))
            | ApiError::Database(PostgresError::MigrateError(_)) => "database error".to_string(),
            ApiError::Serialization(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = -90.0, max = 90.0))]
        latitude: f64,
    }

    #[test]
    fn test_proximity_error_is_field_error() {
        let err: ApiError = ProximityError::InvalidArgument {
            field: "radius",
            message: "must be greater than 0, got 0".to_string(),
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            ApiError::Validation(map) => assert!(map["radius"][0].contains("greater than 0")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validator_errors_keep_field_names() {
        let errors = Probe { latitude: 95.0 }.validate().unwrap_err();
        let map = validation_messages(&errors);
        assert_eq!(map.len(), 1);
        assert!(map["latitude"][0].contains("latitude"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::PlacesDisabled.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Database(PostgresError::NotFound("donor 1".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Database(PostgresError::Conflict("dup".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Database(PostgresError::SqlxError(sqlx::Error::PoolTimedOut)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
