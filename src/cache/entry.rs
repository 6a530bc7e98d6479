//! Cache entry with TTL support

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::types::{Entity, EntityId};

/// A cached entity with its insertion time and time-to-live
///
/// Expiry is measured on the monotonic clock; `fetched_at` is wall-clock
/// metadata for diagnostics only.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached entity
    pub entity: Arc<Entity>,

    /// When the entry was written (monotonic)
    pub inserted_at: Instant,

    /// When the entity was fetched (wall clock)
    pub fetched_at: DateTime<Utc>,

    /// Time-to-live of this entry
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create a new cache entry inserted now
    pub fn new(entity: Arc<Entity>, ttl: Duration) -> Self {
        Self {
            entity,
            inserted_at: Instant::now(),
            fetched_at: Utc::now(),
            ttl,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// An entry inserted at T is expired for any read at or after T + ttl
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Duration) -> CacheEntry {
        let entity = Entity::item(EntityId::new("Q5").unwrap());
        CacheEntry::new(Arc::new(entity), ttl)
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = entry(Duration::from_secs(3600));

        assert_eq!(entry.id().as_str(), "Q5");
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = entry(Duration::from_secs(10));
        let t = entry.inserted_at;

        assert!(!entry.is_expired_at(t));
        assert!(!entry.is_expired_at(t + Duration::from_millis(9_999)));
        assert!(entry.is_expired_at(t + Duration::from_secs(10)));
        assert!(entry.is_expired_at(t + Duration::from_secs(11)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration_with_clock() {
        let entry = entry(Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!entry.is_expired());
        assert_eq!(entry.age(), Duration::from_secs(59));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_expired());
        assert_eq!(entry.age(), Duration::from_secs(60));
    }
}
