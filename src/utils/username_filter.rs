use autoscale_cuckoo_filter::CuckooFilter;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// Probabilistic set of usernames that may exist. A miss is definitive.
pub struct UsernameFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for UsernameFilter {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

impl UsernameFilter {
    /// Check if a username might exist (false positives possible).
    /// A poisoned lock answers "maybe" so callers fall back to storage.
    pub fn might_exist(&self, username: &str) -> bool {
        let username = normalize(username);
        self.inner
            .read()
            .map(|filter| filter.contains(&username))
            .unwrap_or(true)
    }

    pub fn insert(&self, username: &str) {
        let username = normalize(username);
        if let Ok(mut filter) = self.inner.write() {
            filter.add(&username);
        }
    }

    pub fn remove(&self, username: &str) {
        let username = normalize(username);
        if let Ok(mut filter) = self.inner.write() {
            filter.remove(&username);
        }
    }

    /// Insert a batch of usernames under one write lock
    pub fn insert_batch(&self, usernames: &[String]) {
        if let Ok(mut filter) = self.inner.write() {
            for username in usernames {
                filter.add(&normalize(username));
            }
        }
    }
}
