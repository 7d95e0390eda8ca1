use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, NON_FIELD_ERRORS, REQUIRED};
use crate::model::leave_type::LeaveType;

pub const DATE_ORDER: &str = "The start date must be on or before the end date.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[schema(example = json!({
    "leave_type_id": 1,
    "start_date": "2024-05-05",
    "end_date": "2024-05-10",
    "reason": "Family trip"
}))]
pub struct LeaveRequestForm {
    #[serde(default)]
    pub leave_type_id: Option<u64>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedLeaveRequest {
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

/// Start must not come after end; a one-day leave has equal dates.
pub fn check_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if start > end { Err(DATE_ORDER) } else { Ok(()) }
}

impl LeaveRequestForm {
    /// Validates the form against the current leave-type catalog.
    pub fn clean(&self, catalog: &[LeaveType]) -> Result<CleanedLeaveRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        match self.leave_type_id {
            None => errors.add("leave_type_id", REQUIRED),
            Some(id) if !catalog.iter().any(|t| t.id == id) => {
                errors.add("leave_type_id", INVALID_CHOICE)
            }
            Some(_) => {}
        }
        if self.start_date.is_none() {
            errors.add("start_date", REQUIRED);
        }
        if self.end_date.is_none() {
            errors.add("end_date", REQUIRED);
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            errors.add("reason", REQUIRED);
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if let Err(message) = check_date_order(start, end) {
                errors.add(NON_FIELD_ERRORS, message);
            }
        }

        match (self.leave_type_id, self.start_date, self.end_date) {
            (Some(leave_type_id), Some(start_date), Some(end_date)) if errors.is_empty() => {
                Ok(CleanedLeaveRequest {
                    leave_type_id,
                    start_date,
                    end_date,
                    reason: reason.to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}
