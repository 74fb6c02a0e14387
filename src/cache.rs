use crate::clock::{Clock, SystemClock};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime},
};

/// A cache used to skip unnecessary network requests.
///
/// Successful lookups and failed lookups are tracked separately, each with
/// their own time-to-live. Entries are never swept in the background; whether
/// an entry is still valid gets decided whenever it is read.
///
/// A hostname will never have a valid success entry and a valid failure entry
/// at the same time.
///
/// We need to use internal mutability here because the same cache is shared
/// between concurrent resolutions and the administration endpoints. The
/// [`MutexGuard`] is only ever held for the duration of a single lookup or
/// update, so it's okay to use a [`std::sync::Mutex`].
#[derive(Debug)]
pub struct ResolutionCache {
    entries: Mutex<Entries>,
    clock: Arc<dyn Clock>,
    success_ttl: Duration,
    failure_ttl: Duration,
}

#[derive(Debug, Default)]
struct Entries {
    successes: HashMap<String, SuccessEntry>,
    failures: HashMap<String, FailureEntry>,
}

impl ResolutionCache {
    /// How long a successful lookup is remembered for.
    pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    /// How long we back off after every strategy failed for a hostname.
    pub const DEFAULT_FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

    /// Create an empty [`ResolutionCache`] using the default TTLs.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        ResolutionCache::with_ttls(
            clock,
            ResolutionCache::DEFAULT_SUCCESS_TTL,
            ResolutionCache::DEFAULT_FAILURE_TTL,
        )
    }

    /// Create an empty [`ResolutionCache`] with custom TTLs.
    pub fn with_ttls(
        clock: Arc<dyn Clock>,
        success_ttl: Duration,
        failure_ttl: Duration,
    ) -> Self {
        ResolutionCache {
            entries: Mutex::new(Entries::default()),
            clock,
            success_ttl,
            failure_ttl,
        }
    }

    /// The success entry for `hostname`, as long as it hasn't expired.
    pub fn lookup_success(&self, hostname: &str) -> Option<SuccessEntry> {
        let now = self.clock.now();

        self.entries()
            .successes
            .get(hostname)
            .filter(|entry| is_fresh(entry.fetched_at, now, self.success_ttl))
            .cloned()
    }

    /// The failure entry for `hostname`, as long as it hasn't expired.
    pub fn lookup_failure(&self, hostname: &str) -> Option<FailureEntry> {
        let now = self.clock.now();

        self.entries()
            .failures
            .get(hostname)
            .filter(|entry| is_fresh(entry.failed_at, now, self.failure_ttl))
            .cloned()
    }

    /// Remember that `icon_url` was found for `hostname`, forgetting any
    /// previous failure.
    pub fn record_success(
        &self,
        hostname: &str,
        icon_url: &str,
        method_id: &str,
    ) {
        let entry = SuccessEntry {
            hostname: hostname.to_string(),
            icon_url: icon_url.to_string(),
            method_id: method_id.to_string(),
            fetched_at: self.clock.now(),
        };

        let mut entries = self.entries();
        entries.failures.remove(hostname);
        entries.successes.insert(hostname.to_string(), entry);
    }

    /// Remember that every strategy failed for `hostname`.
    ///
    /// An existing success entry is never evicted. If it is still valid the
    /// failure isn't recorded at all and the success keeps being served until
    /// it expires. Returns whether a failure entry was written.
    pub fn record_failure(&self, hostname: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();

        let has_valid_success = entries
            .successes
            .get(hostname)
            .map(|entry| is_fresh(entry.fetched_at, now, self.success_ttl))
            .unwrap_or(false);

        if has_valid_success {
            log::debug!(
                "Not recording a failure for \"{}\" because it still has a valid icon",
                hostname
            );
            return false;
        }

        entries.failures.insert(
            hostname.to_string(),
            FailureEntry {
                hostname: hostname.to_string(),
                failed_at: now,
            },
        );

        true
    }

    /// Forget everything known about `hostname`, returning `true` if there
    /// was anything to forget.
    pub fn invalidate(&self, hostname: &str) -> bool {
        let mut entries = self.entries();
        let removed_success = entries.successes.remove(hostname).is_some();
        let removed_failure = entries.failures.remove(hostname).is_some();

        removed_success || removed_failure
    }

    /// Forget all entries.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries();
        entries.successes.clear();
        entries.failures.clear();
    }

    /// The total number of entries in both maps, regardless of whether they
    /// are stale.
    pub fn len(&self) -> usize {
        let entries = self.entries();
        entries.successes.len() + entries.failures.len()
    }

    /// Are both maps empty?
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().expect("Mutex was poisoned")
    }
}

impl Default for ResolutionCache {
    fn default() -> Self { ResolutionCache::new(Arc::new(SystemClock)) }
}

fn is_fresh(timestamp: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    match now.duration_since(timestamp) {
        Ok(age) => age < ttl,
        Err(_) => false,
    }
}

/// A timestamped record of the icon found for a hostname.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SuccessEntry {
    /// The cache key.
    pub hostname: String,
    /// Where the icon can be found.
    pub icon_url: String,
    /// The strategy which found it.
    pub method_id: String,
    /// When the [`SuccessEntry`] was created.
    pub fetched_at: SystemTime,
}

/// A timestamp recording the last time every strategy failed for a
/// hostname.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FailureEntry {
    /// The cache key.
    pub hostname: String,
    /// When the [`FailureEntry`] was created.
    pub failed_at: SystemTime,
}
