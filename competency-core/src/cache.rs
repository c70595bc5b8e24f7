//! Caller-owned memo for reconstructed snapshots.
//!
//! Reconstruction is pure, so a snapshot for `(collaborator, cutoff)` only
//! goes stale when the log changes. The cache never watches the log: whoever
//! appends sessions calls [`SnapshotCache::invalidate_collaborator`] (or
//! [`SnapshotCache::invalidate`]) afterwards.
//!
//! Eviction is least-recently-used on a logical clock, so behavior is
//! deterministic.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::log::EvaluationLog;
use crate::snapshot::{CollaboratorSnapshot, reconstruct_with};
use crate::types::CollaboratorId;

/// Default maximum number of cached snapshots.
pub const DEFAULT_CAPACITY: usize = 256;

type Key = (CollaboratorId, DateTime<Utc>);

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: CollaboratorSnapshot,
    last_access: u64,
}

/// Bounded LRU cache of snapshots keyed by collaborator and cutoff.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    entries: BTreeMap<Key, CachedSnapshot>,
    capacity: usize,
    /// Reference instant for timestamp validity; the cutoff when unset.
    now: Option<DateTime<Utc>>,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SnapshotCache {
    /// Create a cache holding at most `capacity` snapshots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
            now: None,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Judge timestamp validity against `now` instead of each cutoff, so
    /// far-future sessions stay out of snapshots taken past the present.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self.entries.clear();
        self
    }

    /// Return the cached snapshot or reconstruct it from `log` and cache it.
    pub fn get_or_reconstruct(
        &mut self,
        log: &EvaluationLog,
        collaborator: CollaboratorId,
        cutoff: DateTime<Utc>,
    ) -> &CollaboratorSnapshot {
        self.clock = self.clock.saturating_add(1);
        let key = (collaborator, cutoff);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                self.hits = self.hits.saturating_add(1);
                trace!(%collaborator, %cutoff, "Snapshot cache hit");
                let cached = occupied.into_mut();
                cached.last_access = self.clock;
                &cached.snapshot
            }
            Entry::Vacant(vacant) => {
                self.misses = self.misses.saturating_add(1);
                trace!(%collaborator, %cutoff, "Snapshot cache miss");
                let cached = vacant.insert(CachedSnapshot {
                    snapshot: reconstruct_with(
                        collaborator,
                        log,
                        cutoff,
                        self.now.unwrap_or(cutoff),
                    ),
                    last_access: self.clock,
                });
                &cached.snapshot
            }
        }
    }

    /// Cached snapshot without touching recency or statistics.
    #[must_use]
    pub fn peek(
        &self,
        collaborator: CollaboratorId,
        cutoff: DateTime<Utc>,
    ) -> Option<&CollaboratorSnapshot> {
        self.entries
            .get(&(collaborator, cutoff))
            .map(|cached| &cached.snapshot)
    }

    /// Drop every cached snapshot. Statistics are kept.
    pub fn invalidate(&mut self) {
        debug!(dropped = self.entries.len(), "Invalidated snapshot cache");
        self.entries.clear();
    }

    /// Drop every cached snapshot of one collaborator.
    pub fn invalidate_collaborator(&mut self, collaborator: CollaboratorId) {
        let before = self.entries.len();
        self.entries.retain(|(id, _), _| *id != collaborator);
        debug!(
            %collaborator,
            dropped = before - self.entries.len(),
            "Invalidated collaborator snapshots"
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, cached)| cached.last_access)
            .map(|(key, _)| *key);

        if let Some(key) = oldest {
            trace!(collaborator = %key.0, cutoff = %key.1, "Evicting snapshot");
            self.entries.remove(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as an integer percentage (0-100).
    #[must_use]
    pub fn hit_rate_percent(&self) -> u8 {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            0
        } else {
            u8::try_from(self.hits.saturating_mul(100) / total).unwrap_or(100)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Criticality, EvaluationSession, Frequency, SkillAssessment};
    use crate::snapshot::reconstruct;
    use crate::types::{SessionId, SkillId};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn session(id: u64, collaborator: u64, when: DateTime<Utc>, level: f64) -> EvaluationSession {
        EvaluationSession::new(
            SessionId(id),
            CollaboratorId(collaborator),
            when,
            vec![SkillAssessment::new(
                SkillId(1),
                level,
                Criticality::Critical,
                Frequency::Daily,
            )],
        )
    }

    fn log() -> EvaluationLog {
        EvaluationLog::from_sessions(vec![
            session(1, 1, at(2024, 1, 1), 2.0),
            session(2, 2, at(2024, 1, 1), 4.0),
        ])
        .unwrap()
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn second_lookup_is_a_hit() {
        let log = log();
        let mut cache = SnapshotCache::new(4);

        let first = cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1)).clone();
        let second = cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));

        assert_eq!(&first, second);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate_percent(), 50);
    }

    #[test]
    fn cached_snapshot_matches_direct_reconstruction() {
        let log = log();
        let mut cache = SnapshotCache::default();

        let cached = cache.get_or_reconstruct(&log, CollaboratorId(2), at(2024, 6, 1));

        assert_eq!(cached, &reconstruct(CollaboratorId(2), &log, at(2024, 6, 1)));
    }

    #[test]
    fn peek_does_not_count() {
        let log = log();
        let mut cache = SnapshotCache::new(4);
        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));

        assert!(cache.peek(CollaboratorId(1), at(2024, 6, 1)).is_some());
        assert!(cache.peek(CollaboratorId(1), at(2024, 7, 1)).is_none());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn anchored_cache_skips_far_future_sessions() {
        let mut log = log();
        log.append(session(3, 1, at(2099, 1, 1), 5.0)).unwrap();
        let mut cache = SnapshotCache::new(4).with_now(at(2024, 6, 1));

        let snapshot = cache.get_or_reconstruct(&log, CollaboratorId(1), at(2100, 1, 1));

        assert_eq!(snapshot.average, 2.0);
        assert_eq!(snapshot.sessions_applied, 1);
    }

    // ==================== Eviction Tests ====================

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let log = log();
        let mut cache = SnapshotCache::new(2);

        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));
        cache.get_or_reconstruct(&log, CollaboratorId(2), at(2024, 6, 1));
        // Touch collaborator 1 so collaborator 2 becomes the oldest.
        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));
        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 7, 1));

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(CollaboratorId(1), at(2024, 6, 1)).is_some());
        assert!(cache.peek(CollaboratorId(2), at(2024, 6, 1)).is_none());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let log = log();
        let mut cache = SnapshotCache::new(0);

        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));

        assert_eq!(cache.stats().capacity, 1);
        assert_eq!(cache.len(), 1);
    }

    // ==================== Invalidation Tests ====================

    #[test]
    fn invalidate_collaborator_picks_up_new_sessions() {
        let mut log = log();
        let mut cache = SnapshotCache::new(8);
        let cutoff = at(2024, 6, 1);

        assert_eq!(cache.get_or_reconstruct(&log, CollaboratorId(1), cutoff).average, 2.0);
        cache.get_or_reconstruct(&log, CollaboratorId(2), cutoff);

        log.append(session(3, 1, at(2024, 2, 1), 5.0)).unwrap();
        cache.invalidate_collaborator(CollaboratorId(1));

        assert!(cache.peek(CollaboratorId(2), cutoff).is_some());
        assert_eq!(cache.get_or_reconstruct(&log, CollaboratorId(1), cutoff).average, 5.0);
    }

    #[test]
    fn invalidate_clears_everything_but_keeps_stats() {
        let log = log();
        let mut cache = SnapshotCache::new(8);
        cache.get_or_reconstruct(&log, CollaboratorId(1), at(2024, 6, 1));

        cache.invalidate();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }
}
