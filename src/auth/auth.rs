use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::account::Account;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The authenticated caller, injected into handlers explicitly.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub is_staff: bool,
}

impl AuthUser {
    /// Decodes a bearer access token. The result only reflects the claims;
    /// `auth_middleware` replaces it with the live account.
    pub fn from_access_token(token: &str, secret: &str) -> Result<Self, AppError> {
        let claims = verify_token(token, secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized(
                "Access token required".to_string(),
            ));
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            is_staff: claims.is_staff,
        })
    }

    /// Capability check for administrative operations.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AppError::Forbidden("Staff only".to_string()))
        }
    }
}

impl From<&Account> for AuthUser {
    fn from(account: &Account) -> Self {
        AuthUser {
            user_id: account.id,
            username: account.username().to_string(),
            is_staff: account.is_staff,
        }
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // auth_middleware already did the work on protected routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => {
                return ready(Err(
                    AppError::Unauthorized("Missing token".to_string()).into()
                ));
            }
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    AppError::Internal("Config missing".to_string()).into()
                ));
            }
        };

        ready(AuthUser::from_access_token(token, &config.jwt_secret).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};

    #[test]
    fn refresh_tokens_are_not_access_tokens() {
        let (refresh, _) = generate_refresh_token(1, "jdoe", false, "s", 60).unwrap();
        assert!(AuthUser::from_access_token(&refresh, "s").is_err());

        let access = generate_access_token(1, "jdoe", false, "s", 60).unwrap();
        let user = AuthUser::from_access_token(&access, "s").unwrap();
        assert_eq!(user.username, "jdoe");
    }

    #[test]
    fn staff_capability() {
        let mut user = AuthUser {
            user_id: 1,
            username: "boss".to_string(),
            is_staff: true,
        };
        assert!(user.require_staff().is_ok());
        user.is_staff = false;
        assert!(matches!(user.require_staff(), Err(AppError::Forbidden(_))));
    }
}
