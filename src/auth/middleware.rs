use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::store::{AccountRepository, Store};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    tracing::debug!(path = %req.path(), error = %err, "Request rejected by guard");
    req.into_response(err.error_response())
}

/// Validates the bearer access token, reloads the account it names and
/// stores the caller in the request extensions for `AuthUser` to pick up.
/// Staff status comes from the account row, not the token claims.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = match req.app_data::<Data<Config>>() {
        Some(config) => config.jwt_secret.clone(),
        None => return Ok(reject(req, AppError::Internal("App config missing".to_string()))),
    };

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => {
                return Ok(reject(
                    req,
                    AppError::Unauthorized("Invalid Authorization header encoding".to_string()),
                ));
            }
        },
        None => {
            return Ok(reject(
                req,
                AppError::Unauthorized("Missing Authorization header".to_string()),
            ));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(reject(
                req,
                AppError::Unauthorized("Authorization header must start with Bearer".to_string()),
            ));
        }
    };

    let claimed = match AuthUser::from_access_token(token, &secret) {
        Ok(user) => user,
        Err(e) => return Ok(reject(req, e)),
    };

    let store = match req.app_data::<Data<dyn Store>>() {
        Some(store) => store.clone(),
        None => return Ok(reject(req, AppError::Internal("Store missing".to_string()))),
    };

    let auth_user = match store.find_account(claimed.user_id).await {
        Ok(Some(account)) => AuthUser::from(&account),
        Ok(None) => {
            return Ok(reject(
                req,
                AppError::Unauthorized("Account no longer exists".to_string()),
            ));
        }
        Err(e) => return Ok(reject(req, e.into())),
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

/// Capability guard for the admin area: runs after `auth_middleware`.
pub async fn staff_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let allowed = req
        .extensions()
        .get::<AuthUser>()
        .map(AuthUser::require_staff);

    match allowed {
        Some(Ok(())) => next.call(req).await,
        Some(Err(e)) => Ok(reject(req, e)),
        None => Ok(reject(
            req,
            AppError::Unauthorized("Authentication required".to_string()),
        )),
    }
}
