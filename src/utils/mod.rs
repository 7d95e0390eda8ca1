pub mod username_cache;
pub mod username_filter;

use anyhow::{Result, anyhow};
use futures_util::StreamExt;

use crate::store::{AccountRepository, Store};
use username_cache::UsernameCache;
use username_filter::UsernameFilter;

/// Fast username availability: cuckoo filter for negatives, moka cache
/// for positives, storage as the fallback.
#[derive(Default)]
pub struct UsernameIndex {
    filter: UsernameFilter,
    cache: UsernameCache,
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// true  => username AVAILABLE
    /// false => username TAKEN
    pub async fn is_available(&self, store: &dyn Store, username: &str) -> bool {
        // 1. Cuckoo filter: a miss means nobody ever registered it
        if !self.filter.might_exist(username) {
            return true;
        }

        // 2. Moka cache: known taken
        if self.cache.is_taken(username).await {
            return false;
        }

        // 3. Storage fallback
        match store.find_account_by_username(username).await {
            Ok(Some(_)) => {
                self.cache.mark_taken(username).await;
                false
            }
            Ok(None) => true,
            // fail-safe: let the unique key decide on insert
            Err(e) => {
                tracing::warn!(error = %e, "Username lookup failed");
                true
            }
        }
    }

    pub async fn record(&self, username: &str) {
        self.filter.insert(username);
        self.cache.mark_taken(username).await;
    }

    pub async fn forget(&self, username: &str) {
        self.filter.remove(username);
        self.cache.forget(username).await;
    }

    /// Loads every stored username, streaming in batches.
    pub async fn warmup(&self, store: &dyn Store, batch_size: usize) -> Result<usize> {
        let mut stream = store.usernames();

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let username = row.map_err(|e| anyhow!("username fetch failed: {}", e))?;
            batch.push(username);
            total += 1;

            if batch.len() >= batch_size {
                self.filter.insert_batch(&batch);
                self.cache.batch_mark(&batch).await;
                batch.clear();
            }
        }

        // Insert any remaining usernames
        if !batch.is_empty() {
            self.filter.insert_batch(&batch);
            self.cache.batch_mark(&batch).await;
        }

        log::info!("Username index warmup complete: {} users", total);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::{AccountFields, Identity};
    use crate::store::memory::MemoryStore;

    fn fields(username: &str) -> AccountFields {
        AccountFields {
            identity: Identity {
                username: username.to_string(),
                email: "x@example.com".to_string(),
                first_name: "X".to_string(),
                last_name: "Y".to_string(),
            },
            password_hash: "hash".to_string(),
            is_staff: false,
        }
    }

    #[actix_web::test]
    async fn warmup_makes_existing_names_unavailable() {
        let store = MemoryStore::seeded();
        store.create_account(fields("alice")).await.unwrap();
        store.create_account(fields("bob")).await.unwrap();

        let index = UsernameIndex::new();
        assert_eq!(index.warmup(&store, 1).await.unwrap(), 2);
        assert!(!index.is_available(&store, "Alice").await);
        assert!(index.is_available(&store, "carol").await);
    }

    #[actix_web::test]
    async fn forgotten_names_become_available_again() {
        let store = MemoryStore::seeded();
        let index = UsernameIndex::new();
        let alice = store.create_account(fields("alice")).await.unwrap();
        index.record("alice").await;
        assert!(!index.is_available(&store, "alice").await);

        store.delete_account(alice.id).await.unwrap();
        index.forget("alice").await;
        assert!(index.is_available(&store, "alice").await);
    }

    #[actix_web::test]
    async fn cold_filter_defers_to_unique_key() {
        let store = MemoryStore::seeded();
        store.create_account(fields("alice")).await.unwrap();
        let index = UsernameIndex::new();
        // cold filter says "never seen"; the store's unique key catches it on insert
        assert!(index.is_available(&store, "alice").await);
    }
}
