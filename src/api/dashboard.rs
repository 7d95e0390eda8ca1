use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::leave_request::{LeaveRequest, LeaveStatus},
    store::{AccountRepository, LeaveRequestRepository, Store},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveStats {
    #[schema(example = 4)]
    pub total_requests: usize,
    #[schema(example = 1)]
    pub pending_requests: usize,
    #[schema(example = 2)]
    pub approved_requests: usize,
    #[schema(example = 1)]
    pub rejected_requests: usize,
}

/// Employee landing page.
#[derive(Serialize, ToSchema)]
pub struct EmployeeDashboard {
    pub username: String,
    pub stats: LeaveStats,
    /// The five newest requests.
    pub recent_requests: Vec<LeaveRequest>,
    /// Approved requests starting today or later, newest first.
    pub upcoming_leaves: Vec<LeaveRequest>,
    /// Every request of the caller, newest first.
    pub leave_requests: Vec<LeaveRequest>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminStats {
    #[schema(example = 12)]
    pub total_employees: i64,
    #[schema(example = 30)]
    pub total_requests: i64,
    #[schema(example = 3)]
    pub pending_requests: i64,
    #[schema(example = 20)]
    pub approved_requests: i64,
}

#[derive(Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    /// Requests waiting for a decision, oldest first.
    pub pending_requests: Vec<LeaveRequest>,
}

pub fn leave_stats(requests: &[LeaveRequest]) -> LeaveStats {
    requests
        .iter()
        .fold(LeaveStats::default(), |mut stats, request| {
            stats.total_requests += 1;
            match request.status {
                LeaveStatus::Pending => stats.pending_requests += 1,
                LeaveStatus::Approved => stats.approved_requests += 1,
                LeaveStatus::Rejected => stats.rejected_requests += 1,
            }
            stats
        })
}

/// Approved requests that have not started yet or start `today`.
/// Keeps the input order.
pub fn upcoming_leaves(requests: &[LeaveRequest], today: NaiveDate) -> Vec<LeaveRequest> {
    requests
        .iter()
        .filter(|r| r.status == LeaveStatus::Approved && r.start_date >= today)
        .cloned()
        .collect()
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Caller's own leave overview", body = EmployeeDashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn employee_dashboard(
    auth: AuthUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let requests = store.list_leave_requests_for(auth.user_id).await?;
    let today = Utc::now().date_naive();

    let dashboard = EmployeeDashboard {
        username: auth.username,
        stats: leave_stats(&requests),
        recent_requests: requests.iter().take(RECENT_LIMIT).cloned().collect(),
        upcoming_leaves: upcoming_leaves(&requests, today),
        leave_requests: requests,
    };

    Ok(HttpResponse::Ok().json(dashboard))
}

#[utoipa::path(
    get,
    path = "/admin-dashboard",
    responses(
        (status = 200, description = "Organisation-wide totals and pending requests", body = AdminDashboard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_dashboard(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let pending_requests = store
        .list_leave_requests_by_status(LeaveStatus::Pending)
        .await?;

    let stats = AdminStats {
        total_employees: store.count_accounts().await?,
        total_requests: store.count_leave_requests(None).await?,
        pending_requests: pending_requests.len() as i64,
        approved_requests: store
            .count_leave_requests(Some(LeaveStatus::Approved))
            .await?,
    };

    Ok(HttpResponse::Ok().json(AdminDashboard {
        stats,
        pending_requests,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(id: u64, status: LeaveStatus, start: NaiveDate) -> LeaveRequest {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        LeaveRequest {
            id,
            employee_id: 1,
            leave_type_id: 1,
            start_date: start,
            end_date: start,
            reason: String::new(),
            status,
            created_at: at,
            updated_at: at,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn counts_requests_by_status() {
        let requests = vec![
            request(1, LeaveStatus::Pending, day(1)),
            request(2, LeaveStatus::Approved, day(2)),
            request(3, LeaveStatus::Approved, day(3)),
            request(4, LeaveStatus::Rejected, day(4)),
        ];

        assert_eq!(
            leave_stats(&requests),
            LeaveStats {
                total_requests: 4,
                pending_requests: 1,
                approved_requests: 2,
                rejected_requests: 1,
            }
        );
        assert_eq!(leave_stats(&[]), LeaveStats::default());
    }

    #[test]
    fn upcoming_keeps_approved_from_today_on() {
        let requests = vec![
            request(4, LeaveStatus::Approved, day(20)),
            request(3, LeaveStatus::Pending, day(15)),
            request(2, LeaveStatus::Approved, day(10)),
            request(1, LeaveStatus::Approved, day(9)),
        ];

        let ids: Vec<u64> = upcoming_leaves(&requests, day(10))
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![4, 2]);
    }
}
