use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use super::{
    AccountRepository, LeaveRequestRepository, LeaveTypeRepository, RefreshTokenRecord,
    RefreshTokenRepository, StoreError,
};
use crate::model::{
    account::{Account, AccountFields},
    leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest},
    leave_type::{LeaveType, NewLeaveType, default_catalog},
};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<u64, Account>,
    leave_types: BTreeMap<u64, LeaveType>,
    leave_requests: BTreeMap<u64, LeaveRequest>,
    refresh_tokens: BTreeMap<u64, RefreshTokenRecord>,
    sequences: Sequences,
}

/// One auto-increment counter per table, as MySQL keeps them.
#[derive(Default)]
struct Sequences {
    accounts: u64,
    leave_types: u64,
    leave_requests: u64,
    refresh_tokens: u64,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Tables {

    fn username_taken(&self, username: &str, except: Option<u64>) -> bool {
        let wanted = username.to_lowercase();
        self.accounts
            .values()
            .any(|a| Some(a.id) != except && a.identity.username.to_lowercase() == wanted)
    }
}

/// Process-local store with the same semantics as the MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store holding the default leave-type catalog.
    pub fn seeded() -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.write() {
            for seed in default_catalog() {
                let id = next_id(&mut tables.sequences.leave_types);
                tables.leave_types.insert(
                    id,
                    LeaveType {
                        id,
                        name: seed.name,
                        description: seed.description,
                    },
                );
            }
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_account(&self, fields: AccountFields) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        if tables.username_taken(&fields.identity.username, None) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        let id = next_id(&mut tables.sequences.accounts);
        let account = Account {
            id,
            identity: fields.identity,
            password_hash: fields.password_hash,
            is_staff: fields.is_staff,
            date_joined: Utc::now(),
        };
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        let wanted = username.to_lowercase();
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.identity.username.to_lowercase() == wanted)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    async fn count_accounts(&self) -> Result<i64, StoreError> {
        Ok(self.read()?.accounts.len() as i64)
    }

    async fn update_account(
        &self,
        id: u64,
        fields: AccountFields,
    ) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.username_taken(&fields.identity.username, Some(id)) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        let account = tables.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.identity = fields.identity;
        account.password_hash = fields.password_hash;
        account.is_staff = fields.is_staff;
        Ok(account.clone())
    }

    async fn delete_account(&self, id: u64) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.accounts.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.leave_requests.retain(|_, r| r.employee_id != id);
        tables.refresh_tokens.retain(|_, t| t.user_id != id);
        Ok(())
    }

    fn usernames(&self) -> BoxStream<'_, Result<String, StoreError>> {
        let names: Vec<Result<String, StoreError>> = match self.read() {
            Ok(tables) => tables
                .accounts
                .values()
                .map(|a| Ok(a.identity.username.clone()))
                .collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(names).boxed()
    }
}

#[async_trait]
impl LeaveTypeRepository for MemoryStore {
    async fn list_leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        Ok(self.read()?.leave_types.values().cloned().collect())
    }

    async fn find_leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError> {
        Ok(self.read()?.leave_types.get(&id).cloned())
    }

    async fn create_leave_type(&self, leave_type: NewLeaveType) -> Result<LeaveType, StoreError> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.sequences.leave_types);
        let created = LeaveType {
            id,
            name: leave_type.name,
            description: leave_type.description,
        };
        tables.leave_types.insert(id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl LeaveRequestRepository for MemoryStore {
    async fn create_leave_request(
        &self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, StoreError> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&request.employee_id)
            || !tables.leave_types.contains_key(&request.leave_type_id)
        {
            return Err(StoreError::NotFound);
        }
        let id = next_id(&mut tables.sequences.leave_requests);
        let now = Utc::now();
        let created = LeaveRequest {
            id,
            employee_id: request.employee_id,
            leave_type_id: request.leave_type_id,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            status: LeaveStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.leave_requests.insert(id, created.clone());
        Ok(created)
    }

    async fn find_leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.read()?.leave_requests.get(&id).cloned())
    }

    async fn list_leave_requests_for(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut requests: Vec<LeaveRequest> = self
            .read()?
            .leave_requests
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn list_leave_requests_by_status(
        &self,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>, StoreError> {
        Ok(self
            .read()?
            .leave_requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn count_leave_requests(&self, status: Option<LeaveStatus>) -> Result<i64, StoreError> {
        let tables = self.read()?;
        let count = match status {
            Some(status) => tables
                .leave_requests
                .values()
                .filter(|r| r.status == status)
                .count(),
            None => tables.leave_requests.len(),
        };
        Ok(count as i64)
    }

    async fn update_leave_status(
        &self,
        id: u64,
        expected: LeaveStatus,
        new: LeaveStatus,
    ) -> Result<Option<LeaveRequest>, StoreError> {
        let mut tables = self.write()?;
        let request = tables.leave_requests.get_mut(&id).ok_or(StoreError::NotFound)?;
        if request.status != expected {
            return Ok(None);
        }
        request.status = new;
        request.updated_at = Utc::now();
        Ok(Some(request.clone()))
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.refresh_tokens.values().any(|t| t.jti == jti) {
            return Err(StoreError::Duplicate("jti".to_string()));
        }
        let id = next_id(&mut tables.sequences.refresh_tokens);
        tables.refresh_tokens.insert(
            id,
            RefreshTokenRecord {
                id,
                user_id,
                jti: jti.to_string(),
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self
            .read()?
            .refresh_tokens
            .values()
            .find(|t| t.jti == jti)
            .cloned())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        match tables
            .refresh_tokens
            .values_mut()
            .find(|t| t.jti == jti && !t.revoked)
        {
            Some(token) => {
                token.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::Identity;
    use chrono::NaiveDate;

    fn fields(username: &str) -> AccountFields {
        AccountFields {
            identity: Identity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "First".to_string(),
                last_name: "Last".to_string(),
            },
            password_hash: "hash".to_string(),
            is_staff: false,
        }
    }

    fn leave(employee_id: u64, leave_type_id: u64) -> NewLeaveRequest {
        NewLeaveRequest {
            employee_id,
            leave_type_id,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            reason: "trip".to_string(),
        }
    }

    #[actix_web::test]
    async fn seeded_store_has_default_catalog() {
        let store = MemoryStore::seeded();
        let names: Vec<String> = store
            .list_leave_types()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Annual leave", "Sick leave", "Unpaid leave"]);
    }

    #[actix_web::test]
    async fn ids_count_per_table() {
        let store = MemoryStore::seeded();
        let kind = store.list_leave_types().await.unwrap()[0].id;
        let a = store.create_account(fields("alice")).await.unwrap();
        let first = store.create_leave_request(leave(a.id, kind)).await.unwrap();
        let b = store.create_account(fields("bob")).await.unwrap();
        let second = store.create_leave_request(leave(b.id, kind)).await.unwrap();

        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(kind, 1);
    }

    #[actix_web::test]
    async fn usernames_are_unique_case_insensitively() {
        let store = MemoryStore::seeded();
        store.create_account(fields("jdoe")).await.unwrap();
        let err = store.create_account(fields("JDoe")).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate("username".to_string()));
        assert!(store.find_account_by_username("JDOE").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn delete_cascades_to_owned_requests() {
        let store = MemoryStore::seeded();
        let kind = store.list_leave_types().await.unwrap()[0].id;
        let a = store.create_account(fields("alice")).await.unwrap();
        let b = store.create_account(fields("bob")).await.unwrap();
        store.create_leave_request(leave(a.id, kind)).await.unwrap();
        store.create_leave_request(leave(a.id, kind)).await.unwrap();
        let kept = store.create_leave_request(leave(b.id, kind)).await.unwrap();

        store.delete_account(a.id).await.unwrap();

        assert!(store.list_leave_requests_for(a.id).await.unwrap().is_empty());
        assert_eq!(store.count_leave_requests(None).await.unwrap(), 1);
        assert!(store.find_leave_request(kept.id).await.unwrap().is_some());
        assert_eq!(store.delete_account(a.id).await, Err(StoreError::NotFound));
    }

    #[actix_web::test]
    async fn owner_listing_is_newest_first_and_private() {
        let store = MemoryStore::seeded();
        let kind = store.list_leave_types().await.unwrap()[0].id;
        let a = store.create_account(fields("alice")).await.unwrap();
        let b = store.create_account(fields("bob")).await.unwrap();
        let first = store.create_leave_request(leave(a.id, kind)).await.unwrap();
        let second = store.create_leave_request(leave(a.id, kind)).await.unwrap();
        store.create_leave_request(leave(b.id, kind)).await.unwrap();

        let ids: Vec<u64> = store
            .list_leave_requests_for(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[actix_web::test]
    async fn status_update_is_compare_and_set() {
        let store = MemoryStore::seeded();
        let kind = store.list_leave_types().await.unwrap()[0].id;
        let a = store.create_account(fields("alice")).await.unwrap();
        let request = store.create_leave_request(leave(a.id, kind)).await.unwrap();

        let updated = store
            .update_leave_status(request.id, LeaveStatus::Pending, LeaveStatus::Approved)
            .await
            .unwrap()
            .expect("status was pending");
        assert_eq!(updated.status, LeaveStatus::Approved);
        assert_eq!(updated.created_at, request.created_at);
        assert!(updated.updated_at >= request.updated_at);

        let stale = store
            .update_leave_status(request.id, LeaveStatus::Pending, LeaveStatus::Rejected)
            .await
            .unwrap();
        assert!(stale.is_none());

        assert_eq!(
            store
                .update_leave_status(999, LeaveStatus::Pending, LeaveStatus::Approved)
                .await,
            Err(StoreError::NotFound)
        );
    }

    #[actix_web::test]
    async fn refresh_tokens_revoke_once() {
        let store = MemoryStore::seeded();
        let a = store.create_account(fields("alice")).await.unwrap();
        store
            .store_refresh_token(a.id, "jti-1", Utc::now())
            .await
            .unwrap();
        assert!(store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(store.find_refresh_token("jti-1").await.unwrap().unwrap().revoked);
    }
}
