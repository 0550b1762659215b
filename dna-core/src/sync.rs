//! Listen/sync driver (spec §4.8): subscribe to a key, rotate listeners
//! across UTC day boundaries, and catch up on day-bucketed history.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::dht::{Dht, ListenCallback, ListenToken};
use crate::error::{CoreError, DhtError};
use crate::multiwriter::{self, InnerKeyed};

/// Persisted per-key sync cursor (spec §6.3: `last_synced_day`, `last_sync_ts`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncCursor {
    pub last_synced_day: Option<i64>,
    pub last_sync_ts: Option<i64>,
}

/// Small local state store for sync cursors, keyed by the kind's base
/// rule. Mirrors the `get`/`put` shape of `citadel-keystore`'s
/// `StorageBackend` trait — an in-memory implementation here, a real
/// on-disk one is an application concern (spec's Non-goals exclude the
/// local mirror implementation itself, not the cursor's existence).
pub trait SyncStateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<SyncCursor>;
    fn put(&self, key: &str, cursor: SyncCursor);
}

#[derive(Default)]
pub struct InMemorySyncStateStore {
    cursors: RwLock<HashMap<String, SyncCursor>>,
}

impl SyncStateStore for InMemorySyncStateStore {
    fn get(&self, key: &str) -> Option<SyncCursor> {
        self.cursors.read().expect("sync store poisoned").get(key).copied()
    }

    fn put(&self, key: &str, cursor: SyncCursor) {
        self.cursors.write().expect("sync store poisoned").insert(key.to_string(), cursor);
    }
}

/// Register a plain (non-day-bucketed) listener on `base_key`.
pub async fn subscribe(dht: &dyn Dht, base_key: &str, callback: ListenCallback) -> Result<ListenToken, DhtError> {
    let key = crate::keyname::KeyName::derive(base_key);
    dht.listen(&key, callback).await
}

pub async fn unsubscribe(dht: &dyn Dht, token: ListenToken) -> Result<(), DhtError> {
    dht.cancel_listen(token).await
}

/// Fetch-all at `base_rule:<day>`, decode with `decode`, dedupe against
/// `seen` (a running set of inner ids across calls), and merge. Returns
/// the merged, tombstone-filtered items plus the count of ids newly
/// observed in this call.
pub async fn sync_day<T, F>(
    dht: &dyn Dht,
    base_rule: &str,
    day: i64,
    decode: F,
    seen: &mut HashSet<String>,
) -> Result<(Vec<T>, u32), CoreError>
where
    T: InnerKeyed + Clone,
    F: Fn(&[u8]) -> Option<T>,
{
    let key_str = format!("{base_rule}:{day}");
    let all = crate::chunk::fetch_all(dht, &key_str).await?;

    let mut items = Vec::with_capacity(all.len());
    let mut new_count = 0u32;
    for (_writer_id, bytes) in all {
        let Some(item) = decode(&bytes) else {
            tracing::warn!(day, "skipping undecodable multi-writer value");
            continue;
        };
        if seen.insert(item.inner_id().to_string()) {
            new_count += 1;
        }
        items.push(item);
    }

    Ok((multiwriter::merge(items), new_count))
}

/// Iterate [`sync_day`] over `first_day..=last_day`, updating `store`'s
/// persisted cursor to `(last_day, now_s)` when done.
pub async fn sync_range<T, F>(
    dht: &dyn Dht,
    store: &dyn SyncStateStore,
    cursor_key: &str,
    base_rule: &str,
    first_day: i64,
    last_day: i64,
    decode: F,
    seen: &mut HashSet<String>,
    now_s: i64,
) -> Result<Vec<T>, CoreError>
where
    T: InnerKeyed + Clone,
    F: Fn(&[u8]) -> Option<T>,
{
    let mut merged_all = Vec::new();
    for day in first_day..=last_day {
        let (items, _new) = sync_day(dht, base_rule, day, &decode, seen).await?;
        merged_all.extend(items);
    }

    store.put(
        cursor_key,
        SyncCursor {
            last_synced_day: Some(last_day),
            last_sync_ts: Some(now_s),
        },
    );

    Ok(multiwriter::merge(merged_all))
}

/// Smart-sync heuristic (spec §4.8): a recently-synced reader only needs
/// to resync the day either side of today; a stale or first-time reader
/// needs the full retention window.
pub fn smart_sync_range(now_s: i64, cursor: SyncCursor, retention_days: i64, today: i64) -> (i64, i64) {
    const RECENCY_THRESHOLD_S: i64 = 3 * 86_400;

    match cursor.last_sync_ts {
        Some(last_ts) if now_s - last_ts < RECENCY_THRESHOLD_S => (today - 1, today + 1),
        _ => (today - (retention_days - 1), today + 1),
    }
}

/// Grace window (in days) either side of the current day tolerated
/// before a day-bucket listener rotates.
const ROTATION_GRACE_DAYS: i64 = 1;

/// A day-bucketed key's listen context. Rotates at UTC day boundaries:
/// once `current_day` drifts more than [`ROTATION_GRACE_DAYS`] past the
/// day currently being listened to, the old token is cancelled and a
/// fresh one subscribed for `current_day`.
pub struct DayBucketListener {
    base_rule: String,
    listen_day: i64,
    token: Option<ListenToken>,
}

impl DayBucketListener {
    pub fn new(base_rule: impl Into<String>, initial_day: i64) -> Self {
        Self {
            base_rule: base_rule.into(),
            listen_day: initial_day,
            token: None,
        }
    }

    pub fn listen_day(&self) -> i64 {
        self.listen_day
    }

    pub async fn start(&mut self, dht: &dyn Dht, callback: ListenCallback) -> Result<(), DhtError> {
        let key = format!("{}:{}", self.base_rule, self.listen_day);
        let token = subscribe(dht, &key, callback).await?;
        self.token = Some(token);
        Ok(())
    }

    /// `true` if a rotation occurred this call.
    pub fn needs_rotation(&self, current_day: i64) -> bool {
        current_day > self.listen_day + ROTATION_GRACE_DAYS
    }

    pub async fn rotate(&mut self, dht: &dyn Dht, current_day: i64, callback: ListenCallback) -> Result<bool, DhtError> {
        if !self.needs_rotation(current_day) {
            return Ok(false);
        }
        if let Some(token) = self.token.take() {
            dht.cancel_listen(token).await?;
        }
        self.listen_day = current_day;
        self.start(dht, callback).await?;
        Ok(true)
    }
}
