//! The DHT application-state client's "hard core": the keyname KDF, the
//! chunked transport, the multi-writer index, the explicit `CoreContext`
//! that replaces the original's implicit globals, every state-kind
//! adapter, and the listen/sync driver. Built on [`dna_envelope`]'s
//! envelope/self-encryption codec and [`dna_identity`]'s identity
//! lifecycle.
//!
//! The DHT overlay itself (routing, transport, node discovery) is
//! explicitly out of scope — [`dht::Dht`] is the only boundary this
//! crate defines toward it.

pub mod chunk;
pub mod context;
pub mod dht;
pub mod error;
pub mod keyname;
pub mod multiwriter;
pub mod state;
pub mod sync;

pub use context::CoreContext;
pub use dht::{Dht, InMemoryDht, ListenCallback, ListenToken};
pub use error::{CoreError, DhtError};
pub use keyname::KeyName;
pub use sync::{DayBucketListener, InMemorySyncStateStore, SyncCursor, SyncStateStore};
