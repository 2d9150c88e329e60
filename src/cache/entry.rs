//! Persisted cache entry.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// One cached API response.
///
/// `value` holds the JSON-serialized payload. There is at most one entry
/// per `key`; storing again replaces `value` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::at(key, value, Utc::now())
    }

    /// Create an entry with an explicit timestamp.
    pub fn at(key: impl Into<String>, value: Vec<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp,
        }
    }

    /// Age of the entry relative to `now`.
    ///
    /// Timestamps in the future count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is older than `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_age_and_expiry() {
        let now = Utc::now();
        let entry = CacheEntry::at("k", b"1".to_vec(), now - TimeDelta::seconds(10));

        assert_eq!(entry.age(now), Duration::from_secs(10));
        assert!(entry.is_expired(now, Duration::from_secs(9)));
        assert!(!entry.is_expired(now, Duration::from_secs(11)));
    }

    #[test]
    fn test_exact_ttl_is_fresh() {
        let now = Utc::now();
        let entry = CacheEntry::at("k", Vec::new(), now - TimeDelta::seconds(5));
        assert!(!entry.is_expired(now, Duration::from_secs(5)));
    }

    #[test]
    fn test_future_timestamp() {
        let now = Utc::now();
        let entry = CacheEntry::at("k", Vec::new(), now + TimeDelta::seconds(30));
        assert_eq!(entry.age(now), Duration::ZERO);
        assert!(!entry.is_expired(now, Duration::ZERO));
    }
}
