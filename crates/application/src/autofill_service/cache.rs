use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tactic_domain::{EventPayload, EventType, FormFields};
use tokio::sync::Mutex;

/// One cached autofill result.
#[derive(Debug, Clone, PartialEq)]
pub struct AutofillCacheEntry {
    /// Cache key, `{event_type}_{title}`.
    pub key: String,
    /// Payload the form was filled from.
    pub payload: EventPayload,
    /// Filled form.
    pub form_fields: FormFields,
    /// Insertion timestamp.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct CachedEntry {
    entry: AutofillCacheEntry,
    inserted_seq: u64,
    last_used_seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CachedEntry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock = self.clock.saturating_add(1);
        self.clock
    }
}

/// Bounded cache of recent autofill results shared across requests.
///
/// Once an insert pushes the size above capacity, the least recently used
/// entries are evicted in one batch.
#[derive(Debug)]
pub struct AutofillCache {
    state: Mutex<CacheState>,
    capacity: usize,
    eviction_batch: usize,
}

impl AutofillCache {
    /// Default maximum number of entries.
    pub const DEFAULT_CAPACITY: usize = 100;
    /// Default number of entries evicted on overflow.
    pub const DEFAULT_EVICTION_BATCH: usize = 20;

    /// Creates a cache with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_CAPACITY, Self::DEFAULT_EVICTION_BATCH)
    }

    /// Creates a cache with custom limits.
    #[must_use]
    pub fn with_limits(capacity: usize, eviction_batch: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(CacheState::default()),
            capacity,
            eviction_batch: eviction_batch.clamp(1, capacity),
        }
    }

    /// Builds the cache key for a payload.
    #[must_use]
    pub fn cache_key(payload: &EventPayload) -> String {
        format!(
            "{}_{}",
            payload.event_type_or_general().as_str(),
            payload.title().unwrap_or_default()
        )
    }

    /// Inserts or replaces one entry.
    pub async fn insert(&self, key: String, payload: EventPayload, form_fields: FormFields) {
        let mut state = self.state.lock().await;
        let seq = state.tick();
        state.entries.insert(
            key.clone(),
            CachedEntry {
                entry: AutofillCacheEntry {
                    key,
                    payload,
                    form_fields,
                    timestamp: Utc::now(),
                },
                inserted_seq: seq,
                last_used_seq: seq,
            },
        );

        if state.entries.len() > self.capacity {
            let mut by_recency: Vec<(u64, String)> = state
                .entries
                .iter()
                .map(|(key, cached)| (cached.last_used_seq, key.clone()))
                .collect();
            by_recency.sort_unstable();

            for (_, key) in by_recency.into_iter().take(self.eviction_batch) {
                state.entries.remove(&key);
            }
        }
    }

    /// Returns up to `limit` most recently inserted entries of one event type that
    /// carry form fields, newest first. Returned entries count as used.
    pub async fn recent_similar(
        &self,
        event_type: &EventType,
        limit: usize,
    ) -> Vec<AutofillCacheEntry> {
        let mut state = self.state.lock().await;

        let mut matching: Vec<(u64, String)> = state
            .entries
            .iter()
            .filter(|(_, cached)| {
                &cached.entry.payload.event_type_or_general() == event_type
                    && !cached.entry.form_fields.is_empty()
            })
            .map(|(key, cached)| (cached.inserted_seq, key.clone()))
            .collect();
        matching.sort_unstable_by(|left, right| right.0.cmp(&left.0));
        matching.truncate(limit);

        let mut sampled = Vec::with_capacity(matching.len());
        for (_, key) in matching {
            let seq = state.tick();
            if let Some(cached) = state.entries.get_mut(&key) {
                cached.last_used_seq = seq;
                sampled.push(cached.entry.clone());
            }
        }

        sampled
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Returns whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Returns whether a key is cached, without touching recency.
    pub async fn contains(&self, key: &str) -> bool {
        self.state.lock().await.entries.contains_key(key)
    }
}

impl Default for AutofillCache {
    fn default() -> Self {
        Self::new()
    }
}
