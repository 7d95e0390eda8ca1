use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Administrative action on a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

impl LeaveStatus {
    /// The latest decision wins; repeating one leaves the status as is.
    /// Nothing ever moves back to `Pending`.
    pub fn apply(self, decision: Decision) -> LeaveStatus {
        decision.target()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 3,
    "leave_type_id": 1,
    "start_date": "2024-05-05",
    "end_date": "2024-05-10",
    "reason": "Family trip",
    "status": "PENDING",
    "created_at": "2024-05-01T08:00:00Z",
    "updated_at": "2024-05-01T08:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    #[schema(value_type = String)]
    pub start_date: NaiveDate,
    #[schema(value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pending_moves_to_either_decision() {
        assert_eq!(
            LeaveStatus::Pending.apply(Decision::Approve),
            LeaveStatus::Approved
        );
        assert_eq!(
            LeaveStatus::Pending.apply(Decision::Reject),
            LeaveStatus::Rejected
        );
    }

    #[test]
    fn repeating_a_decision_is_a_no_op() {
        assert_eq!(
            LeaveStatus::Approved.apply(Decision::Approve),
            LeaveStatus::Approved
        );
        assert_eq!(
            LeaveStatus::Rejected.apply(Decision::Reject),
            LeaveStatus::Rejected
        );
    }

    #[test]
    fn later_decisions_override_earlier_ones() {
        assert_eq!(
            LeaveStatus::Approved.apply(Decision::Reject),
            LeaveStatus::Rejected
        );
        assert_eq!(
            LeaveStatus::Rejected.apply(Decision::Approve),
            LeaveStatus::Approved
        );
    }

    #[test]
    fn status_uses_uppercase_storage_names() {
        assert_eq!(LeaveStatus::Pending.as_ref(), "PENDING");
        assert_eq!(LeaveStatus::from_str("APPROVED"), Ok(LeaveStatus::Approved));
        assert!(LeaveStatus::from_str("approved").is_err());
        assert_eq!(
            serde_json::to_string(&LeaveStatus::Rejected).unwrap(),
            "\"REJECTED\""
        );
        assert_eq!(LeaveStatus::default(), LeaveStatus::Pending);
    }
}
