//! Shared test utilities for share/open integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::crypto::{RandomError, RandomSource, SealedSecret, SeededRandom};
use common::link::{KeyPlacement, LinkCodec};
use common::protocol::ShareProtocol;
use common::store::{
    CreateSharedSecret, CreatedSharedSecret, MemorySecretStore, SecretStore, SharedSecretRecord,
    StoreError,
};
use url::Url;

pub const ORIGIN: &str = "https://app.example.com";

pub fn codec(placement: KeyPlacement) -> LinkCodec {
    LinkCodec::new(Url::parse(ORIGIN).unwrap())
        .unwrap()
        .with_placement(placement)
}

/// Route protocol logs to the test output, filtered by RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A protocol backed by a fresh in-memory store
pub fn setup_protocol() -> ShareProtocol<MemorySecretStore> {
    init_tracing();
    ShareProtocol::new(MemorySecretStore::new(), codec(KeyPlacement::Query))
}

/// Wraps a memory store and counts calls into it
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemorySecretStore,
    creates: AtomicUsize,
    fetches: AtomicUsize,
}

impl CountingStore {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for CountingStore {
    async fn create(
        &self,
        request: CreateSharedSecret,
    ) -> Result<CreatedSharedSecret, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(request).await
    }

    async fn fetch(&self, id: &str, hashed_hex: &str) -> Result<SharedSecretRecord, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(id, hashed_hex).await
    }
}

/// Seeded randomness that tallies how many bytes were drawn
#[derive(Debug)]
pub struct CountingRandom {
    inner: SeededRandom,
    drawn: AtomicUsize,
}

impl CountingRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SeededRandom::new(seed),
            drawn: AtomicUsize::new(0),
        }
    }

    pub fn drawn(&self) -> usize {
        self.drawn.load(Ordering::SeqCst)
    }
}

impl RandomSource for CountingRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        self.drawn.fetch_add(dest.len(), Ordering::SeqCst);
        self.inner.fill_bytes(dest)
    }
}

/// What a [`TamperingStore`] does to records on the way out
#[derive(Debug, Clone, Copy)]
pub enum Tamper {
    /// Flip one bit of the ciphertext
    Ciphertext,
    /// Flip one bit of the tag
    Tag,
    /// Drop the last byte of the IV
    TruncateIv,
    /// Report a lookup hash other than the one stored
    HashedHex,
    /// Pretend the record expired
    Expire,
}

/// A store that corrupts what it hands back
#[derive(Debug)]
pub struct TamperingStore {
    pub inner: MemorySecretStore,
    pub tamper: Tamper,
}

impl TamperingStore {
    pub fn new(tamper: Tamper) -> Self {
        Self {
            inner: MemorySecretStore::new(),
            tamper,
        }
    }
}

#[async_trait]
impl SecretStore for TamperingStore {
    async fn create(
        &self,
        request: CreateSharedSecret,
    ) -> Result<CreatedSharedSecret, StoreError> {
        self.inner.create(request).await
    }

    async fn fetch(&self, id: &str, hashed_hex: &str) -> Result<SharedSecretRecord, StoreError> {
        let mut record = self.inner.fetch(id, hashed_hex).await?;
        let mut sealed =
            SealedSecret::from_base64(&record.encrypted_value, &record.iv, &record.tag).unwrap();

        match self.tamper {
            Tamper::Ciphertext => sealed.ciphertext[0] ^= 0x01,
            Tamper::Tag => sealed.tag[0] ^= 0x80,
            Tamper::TruncateIv => {
                sealed.iv.pop();
            }
            Tamper::HashedHex => record.hashed_hex = Some("00".repeat(32)),
            Tamper::Expire => return Err(StoreError::Expired(id.to_string())),
        }

        record.encrypted_value = sealed.ciphertext_base64();
        record.iv = sealed.iv_base64();
        record.tag = sealed.tag_base64();
        Ok(record)
    }
}
