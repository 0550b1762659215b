//! Chunked transport (spec §4.4): split/join large blobs across many
//! DHT values, with parallel fetch, ZSTD compression, and per-owner vs
//! multi-owner read/write modes.

use std::time::Duration;

use dna_envelope::envelope::{self, Envelope, EnvelopeKind};
use dna_envelope::signature::{self, SignPublicKey, SignSecretKey};
use futures::stream::{FuturesUnordered, StreamExt};
use sha3::{Digest, Sha3_256};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::dht::Dht;
use crate::keyname::KeyName;

/// Chunk payload ceiling, comfortably below the assumed 64 KiB DHT
/// per-value limit (spec §6.1).
pub const CHUNK_MAX: usize = 32 * 1024;
/// Sanity ceiling on the total blob size a single publish may carry.
pub const MAX_BLOB_BYTES: usize = 64 * 1024 * 1024;
/// Default bounded fan-out for parallel chunk fetch.
pub const CHUNK_FANOUT: usize = 8;
/// Per-chunk retry budget on transient errors.
pub const CHUNK_RETRIES: u32 = 3;
/// Default total wall-time budget for a chunked fetch.
pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(30);

const CHUNK_VALUE_VERSION: u8 = 1;
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk not found")]
    NotFound,
    #[error("chunk fetch timed out")]
    Timeout,
    #[error("reassembled blob failed content hash verification")]
    Corrupt,
    #[error("blob exceeds the {0}-byte sanity ceiling")]
    TooLarge(usize),
    #[error("compression failed: {0}")]
    CompressFail(String),
    #[error("signing or verification failed: {0}")]
    SignFail(String),
}

/// State machine for a single chunked fetch (Design Notes, "tagged
/// variants" — exercised unit-testably on its own, independent of any
/// real I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    QueryManifest,
    FetchChunks { remaining: u32 },
    Verify,
    Done,
    Failed,
}

impl FetchState {
    pub fn start() -> Self {
        FetchState::QueryManifest
    }

    pub fn on_manifest_ok(total_chunks: u32) -> Self {
        if total_chunks <= 1 {
            FetchState::Verify
        } else {
            FetchState::FetchChunks {
                remaining: total_chunks - 1,
            }
        }
    }

    /// Advance after successfully fetching one more chunk.
    pub fn on_chunk_ok(self) -> Self {
        match self {
            FetchState::FetchChunks { remaining } if remaining > 1 => FetchState::FetchChunks { remaining: remaining - 1 },
            FetchState::FetchChunks { .. } => FetchState::Verify,
            other => other,
        }
    }

    pub fn on_error(self) -> Self {
        FetchState::Failed
    }

    pub fn on_verify_ok(self) -> Self {
        FetchState::Done
    }
}

/// Wire format of one chunk value (spec §6.2), network byte order.
#[derive(Debug, Clone)]
pub struct ChunkValue {
    pub chunk_version: u8,
    pub total_chunks: u32,
    pub chunk_index: u32,
    pub total_size: u64,
    pub content_hash: [u8; 32],
    pub compression_flag: u8,
    pub payload: Vec<u8>,
}

impl ChunkValue {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 + 4 + 8 + 32 + 1 + self.payload.len());
        out.push(self.chunk_version);
        out.extend_from_slice(&self.total_chunks.to_be_bytes());
        out.extend_from_slice(&self.chunk_index.to_be_bytes());
        out.extend_from_slice(&self.total_size.to_be_bytes());
        out.extend_from_slice(&self.content_hash);
        out.push(self.compression_flag);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChunkError> {
        const HEADER_LEN: usize = 1 + 4 + 4 + 8 + 32 + 1;
        if bytes.len() < HEADER_LEN {
            return Err(ChunkError::Corrupt);
        }
        let mut off = 0;
        let chunk_version = bytes[off];
        off += 1;
        let total_chunks = u32::from_be_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let chunk_index = u32::from_be_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let total_size = u64::from_be_bytes(bytes[off..off + 8].try_into().unwrap());
        off += 8;
        let mut content_hash = [0u8; 32];
        content_hash.copy_from_slice(&bytes[off..off + 32]);
        off += 32;
        let compression_flag = bytes[off];
        off += 1;
        let payload = bytes[off..].to_vec();

        Ok(Self {
            chunk_version,
            total_chunks,
            chunk_index,
            total_size,
            content_hash,
            compression_flag,
            payload,
        })
    }
}

fn content_hash_of(plaintext: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(plaintext));
    out
}

fn compress(plaintext: &[u8]) -> Result<Vec<u8>, ChunkError> {
    zstd::stream::encode_all(plaintext, COMPRESSION_LEVEL).map_err(|e| ChunkError::CompressFail(e.to_string()))
}

fn decompress(compressed: &[u8]) -> Result<Vec<u8>, ChunkError> {
    zstd::stream::decode_all(compressed).map_err(|e| ChunkError::CompressFail(e.to_string()))
}

fn manifest_key(base: &str) -> KeyName {
    KeyName::derive(base)
}

fn chunk_sub_key(base: &str, index: u32) -> KeyName {
    KeyName::derive_sub(base, &format!(":chunk:{index}"))
}

fn build_chunk_values(plaintext: &[u8]) -> Result<Vec<ChunkValue>, ChunkError> {
    if plaintext.len() > MAX_BLOB_BYTES {
        return Err(ChunkError::TooLarge(MAX_BLOB_BYTES));
    }
    let content_hash = content_hash_of(plaintext);
    let compressed = compress(plaintext)?;

    let chunks: Vec<&[u8]> = if compressed.is_empty() {
        vec![&compressed[..]]
    } else {
        compressed.chunks(CHUNK_MAX).collect()
    };
    let total_chunks = chunks.len() as u32;

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, payload)| ChunkValue {
            chunk_version: CHUNK_VALUE_VERSION,
            total_chunks,
            chunk_index: i as u32,
            total_size: plaintext.len() as u64,
            content_hash,
            compression_flag: 1,
            payload: payload.to_vec(),
        })
        .collect())
}

fn sign_chunk_envelope(value: &ChunkValue, timestamp_s: u64, ttl_s: u32, sign_sk: &SignSecretKey) -> Result<Vec<u8>, ChunkError> {
    let expiry_s = timestamp_s + ttl_s as u64;
    let payload = value.encode();
    let mut signed = Vec::with_capacity(payload.len() + 8);
    signed.extend_from_slice(&payload);
    signed.extend_from_slice(&timestamp_s.to_be_bytes());
    let sig = signature::sign(&signed, sign_sk);
    envelope::encode(EnvelopeKind::Transport, envelope::VERSION, timestamp_s, expiry_s, &payload, &sig)
        .map_err(|e| ChunkError::SignFail(e.to_string()))
}

/// Single-writer chunked publish (spec §4.4 "Publish").
pub async fn publish(
    dht: &dyn Dht,
    sign_sk: &SignSecretKey,
    base_key: &str,
    plaintext: &[u8],
    ttl_s: u32,
    timestamp_s: u64,
) -> Result<(), ChunkError> {
    let values = build_chunk_values(plaintext)?;

    let manifest_envelope = sign_chunk_envelope(&values[0], timestamp_s, ttl_s, sign_sk)?;
    dht.put(&manifest_key(base_key), manifest_envelope, ttl_s)
        .await
        .map_err(|_| ChunkError::Timeout)?;

    for value in values.iter().skip(1) {
        let env = sign_chunk_envelope(value, timestamp_s, ttl_s, sign_sk)?;
        dht.put(&chunk_sub_key(base_key, value.chunk_index), env, ttl_s)
            .await
            .map_err(|_| ChunkError::Timeout)?;
    }

    Ok(())
}

/// Multi-writer variant: tags the manifest with the writer's `value_id`,
/// overwriting only that writer's own prior value, and tags each
/// subsequent chunk with `value_id.wrapping_add(1 + chunk_index)` so two
/// writers' chunks at the same index never collide at the same DHT key.
/// Used by [`crate::state::common::publish_multiwriter`] once a payload
/// reaches [`crate::multiwriter::MULTIWRITER_INLINE_MAX`]; readers
/// reassemble via [`fetch_all_reassembled`].
pub async fn publish_as_mine(
    dht: &dyn Dht,
    sign_sk: &SignSecretKey,
    value_id: u64,
    base_key: &str,
    plaintext: &[u8],
    ttl_s: u32,
    timestamp_s: u64,
    kind_tag: &str,
) -> Result<(), ChunkError> {
    let values = build_chunk_values(plaintext)?;
    let manifest_envelope = sign_chunk_envelope(&values[0], timestamp_s, ttl_s, sign_sk)?;
    dht.put_signed(&manifest_key(base_key), manifest_envelope, value_id, ttl_s, kind_tag)
        .await
        .map_err(|_| ChunkError::Timeout)?;

    for value in values.iter().skip(1) {
        let env = sign_chunk_envelope(value, timestamp_s, ttl_s, sign_sk)?;
        let sub_id = value_id.wrapping_add(1 + value.chunk_index as u64);
        dht.put_signed(&chunk_sub_key(base_key, value.chunk_index), env, sub_id, ttl_s, kind_tag)
            .await
            .map_err(|_| ChunkError::Timeout)?;
    }

    Ok(())
}

fn open_chunk_envelope(bytes: &[u8], author_pk: &SignPublicKey) -> Result<ChunkValue, ChunkError> {
    let env: Envelope<'_> = envelope::decode(bytes, EnvelopeKind::Transport, envelope::VERSION, envelope::VERSION).map_err(|_| ChunkError::Corrupt)?;
    env.verify(author_pk).map_err(|_| ChunkError::Corrupt)?;
    ChunkValue::decode(env.payload)
}

async fn fetch_chunk_with_retry(dht: &dyn Dht, key: KeyName, author_pk: &SignPublicKey) -> Result<ChunkValue, ChunkError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match dht.get(&key).await {
            Ok(Some(bytes)) => return open_chunk_envelope(&bytes, author_pk),
            Ok(None) => return Err(ChunkError::NotFound),
            Err(_) if attempts < CHUNK_RETRIES => continue,
            Err(_) => return Err(ChunkError::Timeout),
        }
    }
}

/// Fetch and reassemble a blob previously published with [`publish`].
pub async fn fetch(dht: &dyn Dht, base_key: &str, author_pk: &SignPublicKey) -> Result<Vec<u8>, ChunkError> {
    fetch_with_deadline(dht, base_key, author_pk, DEFAULT_FETCH_DEADLINE).await
}

pub async fn fetch_with_deadline(
    dht: &dyn Dht,
    base_key: &str,
    author_pk: &SignPublicKey,
    deadline: Duration,
) -> Result<Vec<u8>, ChunkError> {
    let fetch_fut = fetch_inner(dht, base_key, author_pk);
    match tokio::time::timeout(deadline, fetch_fut).await {
        Ok(result) => result,
        Err(_) => Err(ChunkError::Timeout),
    }
}

async fn fetch_inner(dht: &dyn Dht, base_key: &str, author_pk: &SignPublicKey) -> Result<Vec<u8>, ChunkError> {
    let manifest_bytes = dht
        .get(&manifest_key(base_key))
        .await
        .map_err(|_| ChunkError::Timeout)?
        .ok_or(ChunkError::NotFound)?;
    let manifest = open_chunk_envelope(&manifest_bytes, author_pk)?;

    let mut chunks = vec![(0u32, manifest.payload.clone())];

    if manifest.total_chunks > 1 {
        let semaphore = Semaphore::new(CHUNK_FANOUT.min(manifest.total_chunks as usize));
        let mut tasks = FuturesUnordered::new();
        for index in 1..manifest.total_chunks {
            let key = chunk_sub_key(base_key, index);
            let semaphore = &semaphore;
            tasks.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let value = fetch_chunk_with_retry(dht, key, author_pk).await?;
                Ok::<_, ChunkError>((index, value.payload))
            });
        }
        while let Some(result) = tasks.next().await {
            chunks.push(result?);
        }
    }

    chunks.sort_by_key(|(index, _)| *index);
    let mut compressed = Vec::new();
    for (_, payload) in chunks {
        compressed.extend_from_slice(&payload);
    }

    let plaintext = if manifest.compression_flag == 1 {
        decompress(&compressed)?
    } else {
        compressed
    };

    if plaintext.len() as u64 != manifest.total_size || content_hash_of(&plaintext) != manifest.content_hash {
        return Err(ChunkError::Corrupt);
    }

    Ok(plaintext)
}

/// Fetch only the caller's own latest value at a multi-writer key.
pub async fn fetch_mine(dht: &dyn Dht, base_key: &str) -> Result<Option<Vec<u8>>, ChunkError> {
    let all = dht
        .get_all(&manifest_key(base_key))
        .await
        .map_err(|_| ChunkError::Timeout)?;
    let owner = dht.owner_value_id();
    Ok(all.into_iter().find(|(id, _)| *id == owner).map(|(_, v)| v))
}

/// Fetch the set of `(writer_value_id, bytes)` pairs currently stored at
/// a multi-writer key, as raw manifest-key bytes with no reassembly.
/// Correct only when every writer's value fits in one chunk; prefer
/// [`fetch_all_reassembled`] when a writer may have used
/// [`publish_as_mine`] for an oversized value.
pub async fn fetch_all(dht: &dyn Dht, base_key: &str) -> Result<Vec<(u64, Vec<u8>)>, ChunkError> {
    dht.get_all(&manifest_key(base_key)).await.map_err(|_| ChunkError::Timeout)
}

/// `true` if `bytes` is framed as this module's own chunk-transport
/// envelope (i.e. was published via [`publish_as_mine`]) rather than an
/// inline value a caller put directly under the multi-writer key.
fn is_chunk_wrapped(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == EnvelopeKind::Transport.magic()
}

/// Reassemble one writer's complete blob from its manifest (the bytes
/// already fetched for `writer_id`) plus, if `total_chunks > 1`, the rest
/// of that writer's chunks — each stored under `chunk_sub_key(base, i)`
/// tagged with the same `value_id.wrapping_add(1 + i)` convention
/// [`publish_as_mine`] writes with, and retrieved by matching that tag
/// among the (possibly many writers') values at that chunk sub-key.
async fn reassemble_one(
    dht: &dyn Dht,
    base_key: &str,
    writer_id: u64,
    manifest_bytes: &[u8],
    author_pk: &SignPublicKey,
) -> Result<Vec<u8>, ChunkError> {
    let manifest = open_chunk_envelope(manifest_bytes, author_pk)?;
    let mut chunks = vec![(0u32, manifest.payload.clone())];

    if manifest.total_chunks > 1 {
        for index in 1..manifest.total_chunks {
            let key = chunk_sub_key(base_key, index);
            let sub_id = writer_id.wrapping_add(1 + index as u64);
            let slots = dht.get_all(&key).await.map_err(|_| ChunkError::Timeout)?;
            let (_, bytes) = slots
                .into_iter()
                .find(|(id, _)| *id == sub_id)
                .ok_or(ChunkError::NotFound)?;
            let value = open_chunk_envelope(&bytes, author_pk)?;
            chunks.push((index, value.payload));
        }
    }

    chunks.sort_by_key(|(index, _)| *index);
    let mut compressed = Vec::new();
    for (_, payload) in chunks {
        compressed.extend_from_slice(&payload);
    }

    let plaintext = if manifest.compression_flag == 1 {
        decompress(&compressed)?
    } else {
        compressed
    };

    if plaintext.len() as u64 != manifest.total_size || content_hash_of(&plaintext) != manifest.content_hash {
        return Err(ChunkError::Corrupt);
    }

    Ok(plaintext)
}

/// Fetch the set of `(writer_value_id, bytes)` pairs currently stored at
/// a multi-writer key, reassembling any writer's value that was
/// published through [`publish_as_mine`]'s chunked path rather than
/// written inline. `resolve_author` maps a writer's `value_id` to its
/// signing public key (needed to verify that writer's chunk-transport
/// signatures); a writer this returns `None` for is skipped, same as an
/// undecodable value (spec §7: integrity errors in a multi-writer set are
/// logged and skipped, not fatal to the read).
pub async fn fetch_all_reassembled(
    dht: &dyn Dht,
    base_key: &str,
    resolve_author: &dyn Fn(u64) -> Option<SignPublicKey>,
) -> Result<Vec<(u64, Vec<u8>)>, ChunkError> {
    let all = fetch_all(dht, base_key).await?;
    let mut out = Vec::with_capacity(all.len());
    for (writer_id, bytes) in all {
        if !is_chunk_wrapped(&bytes) {
            out.push((writer_id, bytes));
            continue;
        }
        let Some(author_pk) = resolve_author(writer_id) else {
            continue;
        };
        match reassemble_one(dht, base_key, writer_id, &bytes, &author_pk).await {
            Ok(plaintext) => out.push((writer_id, plaintext)),
            Err(_) => continue,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_state_single_chunk_skips_straight_to_verify() {
        let state = FetchState::on_manifest_ok(1);
        assert_eq!(state, FetchState::Verify);
    }

    #[test]
    fn fetch_state_multi_chunk_counts_down_to_verify() {
        let mut state = FetchState::on_manifest_ok(3);
        assert_eq!(state, FetchState::FetchChunks { remaining: 2 });
        state = state.on_chunk_ok();
        assert_eq!(state, FetchState::FetchChunks { remaining: 1 });
        state = state.on_chunk_ok();
        assert_eq!(state, FetchState::Verify);
        state = state.on_verify_ok();
        assert_eq!(state, FetchState::Done);
    }

    #[test]
    fn fetch_state_error_goes_to_failed_from_any_state() {
        assert_eq!(FetchState::start().on_error(), FetchState::Failed);
        assert_eq!(FetchState::FetchChunks { remaining: 5 }.on_error(), FetchState::Failed);
    }

    #[test]
    fn chunk_value_round_trips_through_wire_encoding() {
        let value = ChunkValue {
            chunk_version: 1,
            total_chunks: 4,
            chunk_index: 2,
            total_size: 12345,
            content_hash: [7u8; 32],
            compression_flag: 1,
            payload: b"chunk bytes".to_vec(),
        };
        let bytes = value.encode();
        let decoded = ChunkValue::decode(&bytes).unwrap();
        assert_eq!(decoded.total_chunks, 4);
        assert_eq!(decoded.chunk_index, 2);
        assert_eq!(decoded.total_size, 12345);
        assert_eq!(decoded.content_hash, [7u8; 32]);
        assert_eq!(decoded.payload, b"chunk bytes");
    }

    #[test]
    fn build_chunk_values_rejects_oversized_blobs() {
        let err = build_chunk_values(&vec![0u8; MAX_BLOB_BYTES + 1]);
        assert!(matches!(err, Err(ChunkError::TooLarge(_))));
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trip_single_chunk() {
        use crate::dht::InMemoryDht;
        let (pk, sk) = dna_envelope::signature::keygen();
        let dht = InMemoryDht::new(1);
        publish(&dht, &sk, "test:blob", b"hello chunked world", 3600, 1_000)
            .await
            .expect("publish");
        let fetched = fetch(&dht, "test:blob", &pk).await.expect("fetch");
        assert_eq!(fetched, b"hello chunked world");
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trip_multi_chunk() {
        use crate::dht::InMemoryDht;
        let (pk, sk) = dna_envelope::signature::keygen();
        let dht = InMemoryDht::new(1);
        // Highly compressible but large enough (pre-compression) that a
        // poor codec would still need multiple chunks; zstd on all-zero
        // input collapses this to one chunk, exercising Scenario F.
        let blob = vec![0u8; 4 * 1024 * 1024];
        publish(&dht, &sk, "test:big-blob", &blob, 3600, 1_000).await.expect("publish");
        let fetched = fetch(&dht, "test:big-blob", &pk).await.expect("fetch");
        assert_eq!(fetched, blob);
    }

    #[tokio::test]
    async fn fetch_fails_closed_for_unknown_key() {
        use crate::dht::InMemoryDht;
        let (pk, _sk) = dna_envelope::signature::keygen();
        let dht = InMemoryDht::new(1);
        let err = fetch(&dht, "test:missing", &pk).await.unwrap_err();
        assert!(matches!(err, ChunkError::NotFound));
    }

    #[tokio::test]
    async fn publish_as_mine_then_reassemble_round_trips_oversized_value() {
        use crate::dht::InMemoryDht;
        let (pk_a, sk_a) = dna_envelope::signature::keygen();
        let (pk_b, sk_b) = dna_envelope::signature::keygen();
        let dht = InMemoryDht::new(1);

        let value_id_a = 10u64;
        let value_id_b = 20u64;
        let blob_a = vec![1u8; 4 * 1024 * 1024];
        let blob_b = b"small writer-b value".to_vec();

        publish_as_mine(&dht, &sk_a, value_id_a, "test:mw", &blob_a, 3600, 1_000, "kind")
            .await
            .expect("publish a");
        publish_as_mine(&dht, &sk_b, value_id_b, "test:mw", &blob_b, 3600, 1_000, "kind")
            .await
            .expect("publish b");

        let resolve = |writer_id: u64| -> Option<SignPublicKey> {
            if writer_id == value_id_a {
                Some(pk_a.clone())
            } else if writer_id == value_id_b {
                Some(pk_b.clone())
            } else {
                None
            }
        };

        let mut all = fetch_all_reassembled(&dht, "test:mw", &resolve).await.expect("fetch_all_reassembled");
        all.sort_by_key(|(id, _)| *id);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], (value_id_a, blob_a));
        assert_eq!(all[1], (value_id_b, blob_b));
    }
}
