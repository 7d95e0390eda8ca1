use crate::{
    api::{dashboard, employee, leave_request, leave_type},
    auth::{
        handlers,
        middleware::{auth_middleware, staff_middleware},
    },
    config::Config,
    error::AppError,
    validation::{FieldErrors, NON_FIELD_ERRORS},
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let burst = requests_per_min.max(1);
    let per_ms = (60_000 / burst as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using defaults");
            GovernorConfig::default()
        });

    Arc::new(Governor::new(&cfg))
}

/// Malformed JSON bodies answer like any other form error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(FieldErrors::single(NON_FIELD_ERRORS, err.to_string())).into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let enabled = config.rate_limit_enabled;
    let login_limiter = build_limiter(config.rate_login_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.app_data(json_config());

    cfg.service(
        web::scope(config.api_prefix.trim_end_matches('/'))
            // Public routes
            .service(
                web::resource("/register")
                    .wrap(Condition::new(enabled, register_limiter))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(Condition::new(enabled, login_limiter.clone()))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Condition::new(enabled, refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Condition::new(enabled, login_limiter))
                    .route(web::get().to(handlers::logout))
                    .route(web::post().to(handlers::logout)),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware)) // authentication
                    .wrap(Condition::new(enabled, protected_limiter)) // rate limiting
                    .service(
                        web::resource(vec!["/", ""])
                            .route(web::get().to(dashboard::employee_dashboard)),
                    )
                    .service(
                        web::resource("/leave-types")
                            .route(web::get().to(leave_type::list_leave_types)),
                    )
                    .service(
                        web::resource("/submit-leave")
                            .route(web::get().to(leave_request::submit_leave_form))
                            .route(web::post().to(leave_request::submit_leave)),
                    )
                    .service(
                        web::scope("/admin-dashboard")
                            .wrap(from_fn(staff_middleware)) // is_staff capability
                            .service(
                                web::resource("")
                                    .route(web::get().to(dashboard::admin_dashboard)),
                            )
                            // /admin-dashboard/leave/approve/{id}
                            .service(
                                web::resource("/leave/approve/{id}")
                                    .route(web::post().to(leave_request::approve_leave))
                                    .route(web::get().to(leave_request::decision_requires_post)),
                            )
                            // /admin-dashboard/leave/reject/{id}
                            .service(
                                web::resource("/leave/reject/{id}")
                                    .route(web::post().to(leave_request::reject_leave))
                                    .route(web::get().to(leave_request::decision_requires_post)),
                            )
                            .service(
                                web::resource("/leave-types")
                                    .route(web::post().to(leave_type::create_leave_type)),
                            )
                            .service(
                                web::resource("/employees")
                                    .route(web::get().to(employee::list_employees)),
                            )
                            .service(
                                web::resource("/employees/add")
                                    .route(web::get().to(employee::add_employee_form))
                                    .route(web::post().to(employee::add_employee)),
                            )
                            .service(
                                web::resource("/employees/edit/{id}")
                                    .route(web::get().to(employee::get_employee))
                                    .route(web::post().to(employee::update_employee)),
                            )
                            .service(
                                web::resource("/employees/delete/{id}")
                                    .route(web::get().to(employee::confirm_delete_employee))
                                    .route(web::post().to(employee::delete_employee)),
                            ),
                    ),
            ),
    );
}

// LOGIN / REGISTER
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with Authorization: Bearer refresh_token
//       └─ returns a new pair, the old refresh token is revoked
