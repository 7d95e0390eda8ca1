use crate::api::dashboard::{AdminDashboard, AdminStats, EmployeeDashboard, LeaveStats};
use crate::api::employee::{
    AccountFormDescription, DeleteConfirmation, EmployeeDeleted, EmployeeListResponse,
    EmployeeSaved,
};
use crate::api::leave_request::{LeaveDecided, LeaveFormChoices, LeaveSubmitted};
use crate::model::account::AccountView;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::{LeaveType, NewLeaveType};
use crate::models::{LoginReqDto, MessageResponse, SessionResponse};
use crate::validation::FieldErrors;
use crate::validation::account::AccountForm;
use crate::validation::leave_request::LeaveRequestForm;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Desk API",
        version = "1.0.0",
        description = r#"
## Employee Leave Management

Employees request time off; administrators review the requests and manage accounts.

### Key Features
- **Accounts**
  - Self-registration with password rules, login, token refresh and logout
- **Leave Requests**
  - Submit a request for a leave type and date range, follow its status on the dashboard
- **Administration** (staff only)
  - Approve or reject requests, organisation-wide totals, employee CRUD, leave type catalog

### Security
Everything except registration, login, refresh and logout needs a **JWT Bearer** access token.
`/admin-dashboard` operations additionally require a staff account.

### Response Format
- JSON bodies; form errors come back as `{"message", "errors": {field: [messages]}}`
- Successful form submissions carry a `redirect_to` path for the next screen
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::dashboard::employee_dashboard,
        crate::api::dashboard::admin_dashboard,

        crate::api::leave_request::submit_leave_form,
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,

        crate::api::employee::list_employees,
        crate::api::employee::add_employee_form,
        crate::api::employee::add_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::confirm_delete_employee,
        crate::api::employee::delete_employee
    ),
    components(
        schemas(
            LoginReqDto,
            SessionResponse,
            MessageResponse,
            FieldErrors,
            AccountForm,
            AccountView,
            AccountFormDescription,
            EmployeeListResponse,
            EmployeeSaved,
            DeleteConfirmation,
            EmployeeDeleted,
            LeaveRequestForm,
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            NewLeaveType,
            LeaveFormChoices,
            LeaveSubmitted,
            LeaveDecided,
            LeaveStats,
            EmployeeDashboard,
            AdminStats,
            AdminDashboard
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and session APIs"),
        (name = "Dashboard", description = "Employee dashboard"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "Admin", description = "Staff-only review APIs"),
        (name = "Employee", description = "Staff-only employee management APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_leave_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/submit-leave"));
        assert!(
            doc.paths
                .paths
                .contains_key("/admin-dashboard/leave/approve/{id}")
        );
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
