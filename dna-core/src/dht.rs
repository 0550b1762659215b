//! The DHT primitive boundary (spec §6.1). The overlay itself — routing,
//! UDP transport, bucket refresh, node discovery — is explicitly out of
//! scope; this module defines only the trait the rest of `dna-core`
//! consumes, plus an in-memory test double exercising the same contract
//! a real overlay implementation would have to satisfy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::DhtError;
use crate::keyname::KeyName;

pub type ListenCallback = Box<dyn Fn(Vec<u8>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenToken(u64);

/// Required operations from the DHT overlay (spec §6.1). Per-value size
/// ceiling is assumed `<= 64 KiB`; [`crate::chunk`] handles anything
/// larger transparently.
#[async_trait]
pub trait Dht: Send + Sync {
    async fn put(&self, key: &KeyName, value: Vec<u8>, ttl_s: u32) -> Result<(), DhtError>;

    /// Publish a value tagged by the writer's `value_id`, overwriting
    /// only that writer's prior value at `key`.
    async fn put_signed(
        &self,
        key: &KeyName,
        value: Vec<u8>,
        value_id: u64,
        ttl_s: u32,
        kind_tag: &str,
    ) -> Result<(), DhtError>;

    /// Newest single value by DHT policy.
    async fn get(&self, key: &KeyName) -> Result<Option<Vec<u8>>, DhtError>;

    /// Every extant value at the key, one per writer `value_id`.
    async fn get_all(&self, key: &KeyName) -> Result<Vec<(u64, Vec<u8>)>, DhtError>;

    async fn listen(&self, key: &KeyName, callback: ListenCallback) -> Result<ListenToken, DhtError>;

    async fn cancel_listen(&self, token: ListenToken) -> Result<(), DhtError>;

    fn owner_value_id(&self) -> u64;
}

struct SingleSlot {
    value: Vec<u8>,
    inserted_at: u64,
    expires_at: Option<u64>,
}

struct MultiSlot {
    value: Vec<u8>,
    kind_tag: String,
    expires_at: Option<u64>,
}

#[derive(Default)]
struct Listeners {
    next_token: u64,
    by_token: HashMap<u64, ([u8; 64], ListenToken)>,
}

/// In-memory [`Dht`] test double. Not a stand-in for real overlay
/// semantics beyond what the trait's contract requires: `put` appends a
/// new single-value version (newest-wins on `get`), `put_signed` keeps
/// exactly one entry per `(key, value_id)`.
pub struct InMemoryDht {
    owner_value_id: u64,
    single: Mutex<HashMap<[u8; 64], Vec<SingleSlot>>>,
    multi: Mutex<HashMap<[u8; 64], HashMap<u64, MultiSlot>>>,
    listeners: Mutex<Listeners>,
    ordinal: AtomicU64,
}

fn now_s() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}

impl InMemoryDht {
    pub fn new(owner_value_id: u64) -> Self {
        Self {
            owner_value_id,
            single: Mutex::new(HashMap::new()),
            multi: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Listeners::default()),
            ordinal: AtomicU64::new(0),
        }
    }

    fn is_live(expires_at: Option<u64>) -> bool {
        match expires_at {
            None => true,
            Some(at) => now_s() < at,
        }
    }
}

#[async_trait]
impl Dht for InMemoryDht {
    async fn put(&self, key: &KeyName, value: Vec<u8>, ttl_s: u32) -> Result<(), DhtError> {
        let mut single = self.single.lock().expect("dht poisoned");
        let ordinal = self.ordinal.fetch_add(1, Ordering::SeqCst);
        let expires_at = if ttl_s == 0 { None } else { Some(now_s() + ttl_s as u64) };
        single
            .entry(*key.as_bytes())
            .or_default()
            .push(SingleSlot {
                value,
                inserted_at: ordinal,
                expires_at,
            });
        Ok(())
    }

    async fn put_signed(
        &self,
        key: &KeyName,
        value: Vec<u8>,
        value_id: u64,
        ttl_s: u32,
        kind_tag: &str,
    ) -> Result<(), DhtError> {
        let mut multi = self.multi.lock().expect("dht poisoned");
        let expires_at = if ttl_s == 0 { None } else { Some(now_s() + ttl_s as u64) };
        multi.entry(*key.as_bytes()).or_default().insert(
            value_id,
            MultiSlot {
                value,
                kind_tag: kind_tag.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &KeyName) -> Result<Option<Vec<u8>>, DhtError> {
        let single = self.single.lock().expect("dht poisoned");
        let Some(slots) = single.get(key.as_bytes()) else {
            return Ok(None);
        };
        let newest = slots
            .iter()
            .filter(|s| Self::is_live(s.expires_at))
            .max_by_key(|s| s.inserted_at);
        Ok(newest.map(|s| s.value.clone()))
    }

    async fn get_all(&self, key: &KeyName) -> Result<Vec<(u64, Vec<u8>)>, DhtError> {
        let multi = self.multi.lock().expect("dht poisoned");
        let Some(slots) = multi.get(key.as_bytes()) else {
            return Ok(Vec::new());
        };
        Ok(slots
            .iter()
            .filter(|(_, s)| Self::is_live(s.expires_at))
            .map(|(id, s)| (*id, s.value.clone()))
            .collect())
    }

    async fn listen(&self, key: &KeyName, _callback: ListenCallback) -> Result<ListenToken, DhtError> {
        let mut listeners = self.listeners.lock().expect("dht poisoned");
        let id = listeners.next_token;
        listeners.next_token += 1;
        let token = ListenToken(id);
        listeners.by_token.insert(id, (*key.as_bytes(), token));
        Ok(token)
    }

    async fn cancel_listen(&self, token: ListenToken) -> Result<(), DhtError> {
        let mut listeners = self.listeners.lock().expect("dht poisoned");
        listeners
            .by_token
            .remove(&token.0)
            .map(|_| ())
            .ok_or(DhtError::UnknownListenToken)
    }

    fn owner_value_id(&self) -> u64 {
        self.owner_value_id
    }
}
