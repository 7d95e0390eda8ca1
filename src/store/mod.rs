//! Persistence ports. Handlers only see `dyn Store`; the backend is picked
//! at start-up from configuration.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;
use futures::stream::BoxStream;

use crate::model::{
    account::{Account, AccountFields},
    leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest},
    leave_type::{LeaveType, NewLeaveType},
};

#[derive(Debug, Display, PartialEq, Eq)]
pub enum StoreError {
    #[display(fmt = "record not found")]
    NotFound,
    /// A unique column rejected the write; holds the column name.
    #[display(fmt = "duplicate value for {}", _0)]
    Duplicate(String),
    #[display(fmt = "storage backend error: {}", _0)]
    Backend(String),
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_account(&self, fields: AccountFields) -> Result<Account, StoreError>;
    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError>;
    /// Usernames compare case-insensitively.
    async fn find_account_by_username(&self, username: &str)
    -> Result<Option<Account>, StoreError>;
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
    async fn count_accounts(&self) -> Result<i64, StoreError>;
    /// Replaces every editable field. `date_joined` never changes.
    async fn update_account(&self, id: u64, fields: AccountFields)
    -> Result<Account, StoreError>;
    /// Removes the account together with its leave requests and tokens.
    async fn delete_account(&self, id: u64) -> Result<(), StoreError>;
    fn usernames(&self) -> BoxStream<'_, Result<String, StoreError>>;
}

#[async_trait]
pub trait LeaveTypeRepository: Send + Sync {
    async fn list_leave_types(&self) -> Result<Vec<LeaveType>, StoreError>;
    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError>;
    async fn create_leave_type(&self, leave_type: NewLeaveType) -> Result<LeaveType, StoreError>;
}

#[async_trait]
pub trait LeaveRequestRepository: Send + Sync {
    /// Stores a PENDING request; both timestamps are set to now. `NotFound`
    /// when the owner or the leave type does not exist.
    async fn create_leave_request(&self, request: NewLeaveRequest)
    -> Result<LeaveRequest, StoreError>;
    async fn find_leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;
    /// Requests owned by `employee_id`, newest first.
    async fn list_leave_requests_for(&self, employee_id: u64)
    -> Result<Vec<LeaveRequest>, StoreError>;
    /// Requests in `status`, oldest first.
    async fn list_leave_requests_by_status(
        &self,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>, StoreError>;
    async fn count_leave_requests(&self, status: Option<LeaveStatus>) -> Result<i64, StoreError>;
    /// Writes `new` and refreshes `updated_at` only while the stored status
    /// is still `expected`. `Ok(None)` means the status moved underneath us.
    async fn update_leave_status(
        &self,
        id: u64,
        expected: LeaveStatus,
        new: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: u64,
    pub user_id: u64,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;
    /// Idempotent; returns whether a live token was revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError>;
}

pub trait Store:
    AccountRepository + LeaveTypeRepository + LeaveRequestRepository + RefreshTokenRepository
{
}

impl<T> Store for T where
    T: AccountRepository + LeaveTypeRepository + LeaveRequestRepository + RefreshTokenRepository
{
}
