//! Result cache contract
//!
//! Maps a source fingerprint to a previously computed set of analyzer results.
//! The in-memory reference implementation lives in
//! [`crate::infrastructure::cache`]; durable backends implement the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::CacheError;
use crate::domain::analysis::AnalyzerResult;
use crate::domain::source::SourceFingerprint;

/// Cached outcome of one analysis run.
///
/// Immutable once stored: a write replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Wall-clock time of the write
    pub timestamp: DateTime<Utc>,
    pub source: SourceFingerprint,
    pub results: Vec<AnalyzerResult>,
}

impl CacheEntry {
    pub fn new(source: SourceFingerprint, results: Vec<AnalyzerResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            results,
        }
    }

    /// Age relative to `now`; entries stamped in the future have zero age
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Fresh while strictly younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age_at(now) < max_age
    }
}

/// Pluggable result cache storage
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, replacing any previous entry under `key`
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    async fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::SourceKind;

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let mut entry = CacheEntry::new(SourceFingerprint::new(SourceKind::Local, "v"), vec![]);
        entry.timestamp = now - chrono::Duration::minutes(30);

        assert!(entry.is_fresh(Duration::from_secs(3600), now));
        assert!(!entry.is_fresh(Duration::from_secs(1800), now));
        assert!(!entry.is_fresh(Duration::from_secs(60), now));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let now = Utc::now();
        let mut entry = CacheEntry::new(SourceFingerprint::new(SourceKind::Local, "v"), vec![]);
        entry.timestamp = now + chrono::Duration::seconds(10);
        assert_eq!(entry.age_at(now), Duration::ZERO);
    }
}
