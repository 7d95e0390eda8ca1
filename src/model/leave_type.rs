use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Annual leave")]
    pub name: String,
    #[schema(example = "Paid yearly holiday allowance")]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeaveType {
    #[schema(example = "Parental leave")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Leave taken around the birth or adoption of a child")]
    pub description: String,
}

/// Catalog every fresh store starts with.
pub fn default_catalog() -> Vec<NewLeaveType> {
    [
        ("Annual leave", "Paid yearly holiday allowance"),
        ("Sick leave", "Absence due to illness or medical appointments"),
        ("Unpaid leave", "Time off without pay"),
    ]
    .into_iter()
    .map(|(name, description)| NewLeaveType {
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}
