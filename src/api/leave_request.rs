use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::leave_request::{Decision, LeaveRequest, NewLeaveRequest},
    model::leave_type::LeaveType,
    models::MessageResponse,
    store::{LeaveRequestRepository, LeaveTypeRepository, Store, StoreError},
    validation::{
        FieldErrors,
        leave_request::{INVALID_CHOICE, LeaveRequestForm},
    },
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

/// What the submission form offers.
#[derive(Serialize, ToSchema)]
pub struct LeaveFormChoices {
    pub leave_types: Vec<LeaveType>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveSubmitted {
    #[schema(example = "Leave request submitted successfully!")]
    pub message: String,
    #[schema(example = "/")]
    pub redirect_to: String,
    pub leave_request: LeaveRequest,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveDecided {
    #[schema(example = "Leave request approved.")]
    pub message: String,
    #[schema(example = "/admin-dashboard")]
    pub redirect_to: String,
    pub leave_request: LeaveRequest,
}

#[utoipa::path(
    get,
    path = "/submit-leave",
    responses(
        (status = 200, description = "Leave types the caller can choose from", body = LeaveFormChoices),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave_form(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let leave_types = store.list_leave_types().await?;
    Ok(HttpResponse::Ok().json(LeaveFormChoices { leave_types }))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/submit-leave",
    request_body(
        content = LeaveRequestForm,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveSubmitted),
        (status = 400, description = "Field errors, e.g. start date after end date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
    payload: web::Json<LeaveRequestForm>,
) -> Result<HttpResponse, AppError> {
    let catalog = store.list_leave_types().await?;
    let cleaned = payload.clean(&catalog)?;

    let leave_type_id = cleaned.leave_type_id;
    let created = match store
        .create_leave_request(NewLeaveRequest {
            employee_id: auth.user_id,
            leave_type_id,
            start_date: cleaned.start_date,
            end_date: cleaned.end_date,
            reason: cleaned.reason,
        })
        .await
    {
        Ok(created) => created,
        Err(StoreError::NotFound) => {
            return Err(missing_reference(store.get_ref(), leave_type_id).await);
        }
        Err(e) => {
            tracing::error!(error = %e, employee_id = auth.user_id, "Failed to create leave request");
            return Err(e.into());
        }
    };

    tracing::info!(leave_id = created.id, employee_id = auth.user_id, "Leave request submitted");

    Ok(HttpResponse::Created().json(LeaveSubmitted {
        message: "Leave request submitted successfully!".to_string(),
        redirect_to: config.path("/"),
        leave_request: created,
    }))
}

/// Works out which parent row vanished between validation and insert.
async fn missing_reference(store: &dyn Store, leave_type_id: u64) -> AppError {
    match store.find_leave_type(leave_type_id).await {
        Ok(None) => AppError::Validation(FieldErrors::single("leave_type_id", INVALID_CHOICE)),
        Ok(Some(_)) => AppError::Unauthorized("Account no longer exists".to_string()),
        Err(e) => e.into(),
    }
}

/// Applies an administrative decision to a request.
///
/// Repeating a decision leaves the status untouched; a later decision
/// overrides an earlier one. Losing a race against a concurrent decision
/// is reported as a conflict rather than silently overwritten.
pub async fn decide(
    store: &dyn Store,
    leave_id: u64,
    decision: Decision,
) -> Result<LeaveRequest, AppError> {
    let current = store
        .find_leave_request(leave_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Leave request not found".to_string()))?;

    let target = current.status.apply(decision);

    match store
        .update_leave_status(leave_id, current.status, target)
        .await
    {
        Ok(Some(updated)) => Ok(updated),
        Ok(None) => Err(AppError::Conflict(
            "Leave request was updated concurrently, please retry".to_string(),
        )),
        Err(StoreError::NotFound) => {
            Err(AppError::NotFound("Leave request not found".to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, leave_id, "Leave decision failed");
            Err(e.into())
        }
    }
}

async fn decide_and_respond(
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
    leave_id: u64,
    decision: Decision,
) -> Result<HttpResponse, AppError> {
    let updated = decide(store.get_ref(), leave_id, decision).await?;
    tracing::info!(leave_id, status = %updated.status, "Leave request decided");

    let message = match decision {
        Decision::Approve => "Leave request approved.",
        Decision::Reject => "Leave request rejected.",
    };

    Ok(HttpResponse::Ok().json(LeaveDecided {
        message: message.to_string(),
        redirect_to: config.path("/admin-dashboard"),
        leave_request: updated,
    }))
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/leave/approve/{id}",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave request approved", body = LeaveDecided),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Concurrent decision")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn approve_leave(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    decide_and_respond(store, config, path.into_inner(), Decision::Approve).await
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/leave/reject/{id}",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave request rejected", body = LeaveDecided),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Concurrent decision")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reject_leave(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    decide_and_respond(store, config, path.into_inner(), Decision::Reject).await
}

/// Bare message for the decision routes hit with GET, mirroring the
/// "nothing to do, go back" behaviour of the admin screens.
pub async fn decision_requires_post(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::redirect(
        "Decisions must be submitted with POST.",
        &config.path("/admin-dashboard"),
    ))
}
