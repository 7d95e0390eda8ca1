use crate::{
    auth::{handlers::insert_account, password::hash_password},
    config::Config,
    error::AppError,
    model::account::{AccountFields, AccountView},
    store::{AccountRepository, LeaveRequestRepository, Store, StoreError},
    utils::UsernameIndex,
    validation::{
        FieldErrors,
        account::{AccountForm, PASSWORD_MIN_LENGTH, USERNAME_TAKEN},
    },
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub employees: Vec<AccountView>,
    #[schema(example = 1)]
    pub total: usize,
}

/// Describes the add/edit form for clients that render it.
#[derive(Serialize, ToSchema)]
pub struct AccountFormDescription {
    pub fields: Vec<String>,
    pub password_help: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeSaved {
    #[schema(example = "Employee added successfully.")]
    pub message: String,
    #[schema(example = "/admin-dashboard/employees")]
    pub redirect_to: String,
    pub employee: AccountView,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteConfirmation {
    #[schema(example = "Delete this employee and all of their leave requests?")]
    pub message: String,
    pub employee: AccountView,
    /// Leave requests removed together with the account.
    #[schema(example = 2)]
    pub leave_requests: usize,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeDeleted {
    #[schema(example = "Employee deleted successfully.")]
    pub message: String,
    #[schema(example = "/admin-dashboard/employees")]
    pub redirect_to: String,
}

impl AccountFormDescription {
    fn new() -> Self {
        let fields = [
            "username",
            "email",
            "first_name",
            "last_name",
            "password1",
            "password2",
            "is_staff",
        ];
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            password_help: vec![
                "Your password can't be too similar to your other personal information.".to_string(),
                format!("Your password must contain at least {PASSWORD_MIN_LENGTH} characters."),
                "Your password can't be entirely numeric.".to_string(),
            ],
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Employee not found".to_string())
}

#[utoipa::path(
    get,
    path = "/admin-dashboard/employees",
    responses(
        (status = 200, description = "All accounts", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let employees: Vec<AccountView> = store
        .list_accounts()
        .await?
        .iter()
        .map(AccountView::from)
        .collect();

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        total: employees.len(),
        employees,
    }))
}

#[utoipa::path(
    get,
    path = "/admin-dashboard/employees/add",
    responses(
        (status = 200, description = "Form description", body = AccountFormDescription),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn add_employee_form() -> HttpResponse {
    HttpResponse::Ok().json(AccountFormDescription::new())
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/employees/add",
    request_body = AccountForm,
    responses(
        (status = 201, description = "Employee created", body = EmployeeSaved),
        (status = 400, description = "Field errors", body = FieldErrors),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn add_employee(
    form: web::Json<AccountForm>,
    store: web::Data<dyn Store>,
    index: web::Data<UsernameIndex>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let cleaned = form.clean()?;
    let is_staff = cleaned.is_staff.unwrap_or(false);

    let account = insert_account(store.get_ref(), index.get_ref(), cleaned, is_staff).await?;
    info!(employee_id = account.id, username = %account.username(), "Employee added");

    Ok(HttpResponse::Created().json(EmployeeSaved {
        message: "Employee added successfully.".to_string(),
        redirect_to: config.path("/admin-dashboard/employees"),
        employee: AccountView::from(&account),
    }))
}

#[utoipa::path(
    get,
    path = "/admin-dashboard/employees/edit/{id}",
    params(("id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Current account data", body = AccountView),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let account = store
        .find_account(path.into_inner())
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(AccountView::from(&account)))
}

/// Full form validation against an existing record. The password is
/// always replaced; `is_staff` keeps its value when omitted.
#[utoipa::path(
    post,
    path = "/admin-dashboard/employees/edit/{id}",
    params(("id" = u64, Path, description = "Account ID")),
    request_body = AccountForm,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeSaved),
        (status = 400, description = "Field errors", body = FieldErrors),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    path: web::Path<u64>,
    form: web::Json<AccountForm>,
    store: web::Data<dyn Store>,
    index: web::Data<UsernameIndex>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    let existing = store
        .find_account(employee_id)
        .await?
        .ok_or_else(not_found)?;

    let cleaned = form.clean()?;

    let renamed = cleaned.identity.username.to_lowercase() != existing.username().to_lowercase();
    if renamed && !index.is_available(store.get_ref(), &cleaned.identity.username).await {
        return Err(FieldErrors::single("username", USERNAME_TAKEN).into());
    }

    let fields = AccountFields {
        password_hash: hash_password(&cleaned.password)?,
        is_staff: cleaned.is_staff.unwrap_or(existing.is_staff),
        identity: cleaned.identity,
    };

    let updated = store
        .update_account(employee_id, fields)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => not_found(),
            StoreError::Duplicate(_) => FieldErrors::single("username", USERNAME_TAKEN).into(),
            other => {
                error!(error = %other, employee_id, "Failed to update employee");
                other.into()
            }
        })?;

    if updated.username() != existing.username() {
        index.forget(existing.username()).await;
        index.record(updated.username()).await;
    }

    info!(employee_id, "Employee updated");

    Ok(HttpResponse::Ok().json(EmployeeSaved {
        message: "Employee updated successfully.".to_string(),
        redirect_to: config.path("/admin-dashboard/employees"),
        employee: AccountView::from(&updated),
    }))
}

#[utoipa::path(
    get,
    path = "/admin-dashboard/employees/delete/{id}",
    params(("id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "What a delete would remove", body = DeleteConfirmation),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn confirm_delete_employee(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let account = store
        .find_account(path.into_inner())
        .await?
        .ok_or_else(not_found)?;
    let owned = store.list_leave_requests_for(account.id).await?;

    Ok(HttpResponse::Ok().json(DeleteConfirmation {
        message: format!(
            "Delete {} and all of their leave requests?",
            account.display_name()
        ),
        employee: AccountView::from(&account),
        leave_requests: owned.len(),
    }))
}

/// Deletes the account together with every leave request it owns.
#[utoipa::path(
    post,
    path = "/admin-dashboard/employees/delete/{id}",
    params(("id" = u64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Employee deleted", body = EmployeeDeleted),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    path: web::Path<u64>,
    store: web::Data<dyn Store>,
    index: web::Data<UsernameIndex>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    let account = store
        .find_account(employee_id)
        .await?
        .ok_or_else(not_found)?;

    match store.delete_account(employee_id).await {
        Ok(()) => {}
        Err(StoreError::NotFound) => return Err(not_found()),
        Err(e) => {
            error!(error = %e, employee_id, "Failed to delete employee");
            return Err(e.into());
        }
    }

    index.forget(account.username()).await;
    info!(employee_id, username = %account.username(), "Employee deleted");

    Ok(HttpResponse::Ok().json(EmployeeDeleted {
        message: "Employee deleted successfully.".to_string(),
        redirect_to: config.path("/admin-dashboard/employees"),
    }))
}
