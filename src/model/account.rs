use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Base identity shared by every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub identity: Identity,
    /// argon2 PHC string
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl Account {
    pub fn username(&self) -> &str {
        &self.identity.username
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.identity.first_name, self.identity.last_name)
    }
}

/// Everything an account write replaces. The password is already hashed.
#[derive(Debug, Clone)]
pub struct AccountFields {
    pub identity: Identity,
    pub password_hash: String,
    pub is_staff: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "username": "jdoe",
    "email": "jdoe@example.com",
    "first_name": "John",
    "last_name": "Doe",
    "display_name": "John Doe",
    "is_staff": false,
    "date_joined": "2024-05-01T08:00:00Z"
}))]
pub struct AccountView {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub is_staff: bool,
    #[schema(value_type = String)]
    pub date_joined: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.identity.username.clone(),
            email: account.identity.email.clone(),
            first_name: account.identity.first_name.clone(),
            last_name: account.identity.last_name.clone(),
            display_name: account.display_name(),
            is_staff: account.is_staff,
            date_joined: account.date_joined,
        }
    }
}
