use crate::{
    error::AppError,
    model::leave_type::{LeaveType, NewLeaveType},
    store::{LeaveTypeRepository, Store},
    validation::{FieldErrors, REQUIRED},
};
use actix_web::{HttpResponse, web};

const NAME_MAX_LENGTH: usize = 100;

fn clean(form: &NewLeaveType) -> Result<NewLeaveType, FieldErrors> {
    let name = form.name.trim();
    let mut errors = FieldErrors::new();

    if name.is_empty() {
        errors.add("name", REQUIRED);
    } else if name.chars().count() > NAME_MAX_LENGTH {
        errors.add(
            "name",
            format!("Ensure this value has at most {NAME_MAX_LENGTH} characters."),
        );
    }

    errors.into_result(NewLeaveType {
        name: name.to_string(),
        description: form.description.trim().to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/leave-types",
    responses(
        (status = 200, description = "Leave type catalog", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let leave_types = store.list_leave_types().await?;
    Ok(HttpResponse::Ok().json(leave_types))
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/leave-types",
    request_body = NewLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Field errors", body = FieldErrors),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_leave_type(
    payload: web::Json<NewLeaveType>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let cleaned = clean(&payload)?;
    let created = store.create_leave_type(cleaned).await?;
    tracing::info!(leave_type_id = created.id, name = %created.name, "Leave type created");
    Ok(HttpResponse::Created().json(created))
}
