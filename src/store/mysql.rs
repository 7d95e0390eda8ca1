use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::{FromRow, MySqlPool};

use super::{
    AccountRepository, LeaveRequestRepository, LeaveTypeRepository, RefreshTokenRecord,
    RefreshTokenRepository, StoreError,
};
use crate::model::{
    account::{Account, AccountFields, Identity},
    leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest},
    leave_type::{LeaveType, NewLeaveType},
};

const ACCOUNT_COLUMNS: &str =
    "id, username, email, first_name, last_name, password, is_staff, date_joined";

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type_id, start_date, end_date, reason, status, created_at, updated_at";

#[derive(FromRow)]
struct AccountRow {
    id: u64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    is_staff: bool,
    date_joined: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            identity: Identity {
                username: row.username,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            password_hash: row.password,
            is_staff: row.is_staff,
            date_joined: row.date_joined,
        }
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    employee_id: u64,
    leave_type_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = LeaveStatus::from_str(&row.status).map_err(|_| {
            StoreError::Backend(format!(
                "leave request {} has unknown status {:?}",
                row.id, row.status
            ))
        })?;
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RefreshTokenRow {
    id: u64,
    user_id: u64,
    jti: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

fn backend(e: sqlx::Error) -> StoreError {
    tracing::error!(error = %e, "MySQL query failed");
    StoreError::Backend(e.to_string())
}

/// SQLSTATE 23000 on a unique key means the value is taken.
fn unique_violation(e: sqlx::Error, column: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") {
            return StoreError::Duplicate(column.to_string());
        }
    }
    backend(e)
}

/// A missing parent row (error 1452) surfaces as `NotFound`, matching the
/// in-memory store.
fn missing_reference(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    backend(e)
}

fn into_requests(rows: Vec<LeaveRequestRow>) -> Result<Vec<LeaveRequest>, StoreError> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for MySqlStore {
    async fn create_account(&self, fields: AccountFields) -> Result<Account, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts
                (username, email, first_name, last_name, password, is_staff, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.identity.username)
        .bind(&fields.identity.email)
        .bind(&fields.identity.first_name)
        .bind(&fields.identity.last_name)
        .bind(&fields.password_hash)
        .bind(fields.is_staff)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username"))?;

        self.find_account(result.last_insert_id())
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(Account::from))
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        // The column collation is case-insensitive.
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(Account::from))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn count_accounts(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    async fn update_account(
        &self,
        id: u64,
        fields: AccountFields,
    ) -> Result<Account, StoreError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET username = ?, email = ?, first_name = ?, last_name = ?, password = ?, is_staff = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.identity.username)
        .bind(&fields.identity.email)
        .bind(&fields.identity.first_name)
        .bind(&fields.identity.last_name)
        .bind(&fields.password_hash)
        .bind(fields.is_staff)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username"))?;

        self.find_account(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete_account(&self, id: u64) -> Result<(), StoreError> {
        // leave_requests and refresh_tokens go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn usernames(&self) -> BoxStream<'_, Result<String, StoreError>> {
        sqlx::query_scalar::<_, String>("SELECT username FROM accounts")
            .fetch(&self.pool)
            .map(|row| row.map_err(backend))
            .boxed()
    }
}

#[async_trait]
impl LeaveTypeRepository for MySqlStore {
    async fn list_leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        sqlx::query_as::<_, LeaveType>("SELECT id, name, description FROM leave_types ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError> {
        sqlx::query_as::<_, LeaveType>("SELECT id, name, description FROM leave_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn create_leave_type(&self, leave_type: NewLeaveType) -> Result<LeaveType, StoreError> {
        let result = sqlx::query("INSERT INTO leave_types (name, description) VALUES (?, ?)")
            .bind(&leave_type.name)
            .bind(&leave_type.description)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(LeaveType {
            id: result.last_insert_id(),
            name: leave_type.name,
            description: leave_type.description,
        })
    }
}

#[async_trait]
impl LeaveRequestRepository for MySqlStore {
    async fn create_leave_request(
        &self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type_id, start_date, end_date, reason, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.reason)
        .bind(LeaveStatus::Pending.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(missing_reference)?;

        self.find_leave_request(result.last_insert_id())
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_leave_requests_for(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE employee_id = ? ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        into_requests(rows)
    }

    async fn list_leave_requests_by_status(
        &self,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE status = ? ORDER BY id");
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        into_requests(rows)
    }

    async fn count_leave_requests(&self, status: Option<LeaveStatus>) -> Result<i64, StoreError> {
        let query = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests WHERE status = ?")
                    .bind(status.to_string())
            }
            None => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_requests"),
        };
        query.fetch_one(&self.pool).await.map_err(backend)
    }

    async fn update_leave_status(
        &self,
        id: u64,
        expected: LeaveStatus,
        new: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, updated_at = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(new.to_string())
        .bind(Utc::now())
        .bind(id)
        .bind(expected.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let current = self
            .find_leave_request(id)
            .await?
            .ok_or(StoreError::NotFound)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(current))
    }
}

#[async_trait]
impl RefreshTokenRepository for MySqlStore {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "jti"))?;
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, jti, expires_at, revoked
            FROM refresh_tokens
            WHERE jti = ?
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(|r| RefreshTokenRecord {
            id: r.id,
            user_id: r.user_id,
            jti: r.jti,
            expires_at: r.expires_at,
            revoked: r.revoked,
        }))
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}
