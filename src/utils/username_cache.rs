use moka::future::Cache;
use std::time::Duration;

/// Usernames known to be TAKEN. Absence means "ask storage".
#[derive(Clone)]
pub struct UsernameCache {
    inner: Cache<String, bool>,
}

impl Default for UsernameCache {
    fn default() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(500_000) // tune based on memory
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }
}

impl UsernameCache {
    /// Mark a single username as taken
    pub async fn mark_taken(&self, username: &str) {
        self.inner.insert(username.to_lowercase(), true).await;
    }

    /// Check if username is taken
    pub async fn is_taken(&self, username: &str) -> bool {
        self.inner
            .get(&username.to_lowercase())
            .await
            .unwrap_or(false)
    }

    /// Forget a username that was renamed or deleted
    pub async fn forget(&self, username: &str) {
        self.inner.invalidate(&username.to_lowercase()).await;
    }

    /// Batch mark usernames as taken
    pub async fn batch_mark(&self, usernames: &[String]) {
        let futures: Vec<_> = usernames
            .iter()
            .map(|u| self.inner.insert(u.to_lowercase(), true))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }
}
