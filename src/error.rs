use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;
use crate::validation::FieldErrors;

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(FieldErrors),
    #[display(fmt = "unauthorized: {}", _0)]
    Unauthorized(String),
    #[display(fmt = "forbidden: {}", _0)]
    Forbidden(String),
    #[display(fmt = "not found: {}", _0)]
    NotFound(String),
    #[display(fmt = "conflict: {}", _0)]
    Conflict(String),
    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!({
                "message": "Please correct the errors below.",
                "errors": errors,
            }),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => json!({ "message": msg }),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                json!({ "message": "Internal Server Error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("Not found".to_string()),
            StoreError::Duplicate(column) => {
                AppError::Conflict(format!("Duplicate value for {column}"))
            }
            StoreError::Backend(detail) => AppError::Internal(detail),
        }
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("password hashing failed: {e}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token encoding failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn validation_errors_render_per_field() {
        let err = AppError::from(FieldErrors::single("password1", "too short"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"]["password1"][0], "too short");
    }

    #[actix_web::test]
    async fn internal_details_are_not_leaked() {
        let err = AppError::from(StoreError::Backend("connection refused".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[test]
    fn store_errors_map_to_http_classes() {
        assert_eq!(
            AppError::from(StoreError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::Duplicate("username".into())).status_code(),
            StatusCode::CONFLICT
        );
    }
}
