use crate::{
    auth::{
        auth::bearer_token,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::account::{Account, AccountFields},
    models::{LoginReqDto, SessionResponse, TokenType},
    store::{AccountRepository, RefreshTokenRepository, Store, StoreError},
    utils::UsernameIndex,
    validation::{
        FieldErrors,
        account::{AccountForm, CleanedAccount, USERNAME_TAKEN},
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};

/// Persists a validated account and keeps the username index current.
pub async fn insert_account(
    store: &dyn Store,
    index: &UsernameIndex,
    cleaned: CleanedAccount,
    is_staff: bool,
) -> Result<Account, AppError> {
    if !index.is_available(store, &cleaned.identity.username).await {
        return Err(FieldErrors::single("username", USERNAME_TAKEN).into());
    }

    let password_hash = hash_password(&cleaned.password)?;

    let account = store
        .create_account(AccountFields {
            identity: cleaned.identity,
            password_hash,
            is_staff,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => FieldErrors::single("username", USERNAME_TAKEN).into(),
            other => AppError::from(other),
        })?;

    index.record(account.username()).await;
    Ok(account)
}

/// Issues an access/refresh pair and records the refresh token.
pub async fn issue_session(
    store: &dyn Store,
    config: &Config,
    account: &Account,
    message: &str,
    redirect_to: String,
) -> Result<SessionResponse, AppError> {
    let access_token = generate_access_token(
        account.id,
        account.username(),
        account.is_staff,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        account.id,
        account.username(),
        account.is_staff,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    debug!(user_id = account.id, jti = %refresh_claims.jti, "Storing refresh token");
    let expires_at = Utc::now() + Duration::seconds(config.refresh_token_ttl as i64);
    store
        .store_refresh_token(account.id, &refresh_claims.jti, expires_at)
        .await?;

    Ok(SessionResponse {
        message: message.to_string(),
        access_token,
        refresh_token,
        redirect_to,
    })
}

fn landing_page(config: &Config, account: &Account) -> String {
    if account.is_staff {
        config.path("/admin-dashboard")
    } else {
        config.path("/")
    }
}

/// Self-registration: creates a regular employee and logs them in.
#[utoipa::path(
    post,
    path = "/register",
    request_body = AccountForm,
    responses(
        (status = 201, description = "Account created and logged in", body = SessionResponse),
        (status = 400, description = "Field errors", body = FieldErrors)
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip_all, fields(username = %form.username))]
pub async fn register(
    form: web::Json<AccountForm>,
    store: web::Data<dyn Store>,
    index: web::Data<UsernameIndex>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let cleaned = form.clean()?;
    let account = insert_account(store.get_ref(), index.get_ref(), cleaned, false).await?;
    info!(user_id = account.id, "Registration successful");

    let session = issue_session(
        store.get_ref(),
        config.get_ref(),
        &account,
        "Registration successful!",
        config.path("/"),
    )
    .await?;

    Ok(HttpResponse::Created().json(session))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Incorrect username or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip_all, fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::Validation(FieldErrors::single(
            crate::validation::NON_FIELD_ERRORS,
            "Username and password are required.",
        )));
    }

    let invalid = || AppError::Unauthorized("Incorrect username or password.".to_string());

    let account = match store.find_account_by_username(user.username.trim()).await? {
        Some(account) => account,
        None => {
            info!("Invalid credentials: user not found");
            return Err(invalid());
        }
    };

    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    let session = issue_session(
        store.get_ref(),
        config.get_ref(),
        &account,
        "Login successful",
        landing_page(&config, &account),
    )
    .await?;

    info!(user_id = account.id, "Login successful");
    Ok(HttpResponse::Ok().json(session))
}

/// Rotates a refresh token: the presented one is revoked, a new pair issued.
#[utoipa::path(
    post,
    path = "/refresh",
    responses(
        (status = 200, description = "New token pair", body = SessionResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let unauthorized = || AppError::Unauthorized("Invalid refresh token".to_string());

    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;

    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    let record = match store.find_refresh_token(&claims.jti).await? {
        Some(r) if !r.revoked && r.expires_at > Utc::now() => r,
        _ => return Err(unauthorized()),
    };

    // a concurrent refresh may have won the race
    if !store.revoke_refresh_token(&record.jti).await? {
        return Err(unauthorized());
    }

    // staff flag may have changed since the token was issued
    let account = store
        .find_account(record.user_id)
        .await?
        .ok_or_else(unauthorized)?;

    let session = issue_session(
        store.get_ref(),
        config.get_ref(),
        &account,
        "Token refreshed",
        landing_page(&config, &account),
    )
    .await?;

    Ok(HttpResponse::Ok().json(session))
}

/// Revokes the presented refresh token. Always succeeds.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match bearer_token(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = store.revoke_refresh_token(&claims.jti).await {
        tracing::error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
