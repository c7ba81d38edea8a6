use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CreateSharedSecret, CreatedSharedSecret, SecretStore, SharedSecretRecord, StoreError};

/// In-memory secret store
///
/// Behaves like the hosted service: records are addressed by a random id,
/// fetches must present the matching lookup hash, and records disappear once
/// they expire or run out of views.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<RwLock<MemorySecretStoreInner>>,
}

#[derive(Debug, Default)]
struct MemorySecretStoreInner {
    records: HashMap<String, StoredSecret>,
}

impl MemorySecretStoreInner {
    /// Drop every record whose lifetime has run out
    fn purge_expired(&mut self, now: OffsetDateTime) {
        let before = self.records.len();
        self.records.retain(|_, stored| stored.request.expires_at > now);
        let purged = before - self.records.len();
        if purged > 0 {
            tracing::debug!("memory store: purged {} expired shared secret(s)", purged);
        }
    }
}

#[derive(Debug)]
struct StoredSecret {
    request: CreateSharedSecret,
    /// `None` for an unlimited budget
    views_remaining: Option<u32>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records; expired ones linger until the next create or fetch
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.records.contains_key(id))
            .unwrap_or(false)
    }

    /// The create payload stored under `id`, exactly as it was received
    pub fn get_raw(&self, id: &str) -> Option<CreateSharedSecret> {
        let inner = self.inner.read().ok()?;
        inner.records.get(id).map(|stored| stored.request.clone())
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn create(
        &self,
        request: CreateSharedSecret,
    ) -> Result<CreatedSharedSecret, StoreError> {
        if request.encrypted_value.is_empty() || request.iv.is_empty() || request.tag.is_empty() {
            return Err(StoreError::Rejected("missing ciphertext".to_string()));
        }
        if request.hashed_hex.is_empty() {
            return Err(StoreError::Rejected("missing hashed hex".to_string()));
        }
        if request.expires_after_views == Some(0) {
            return Err(StoreError::Rejected(
                "view limit must be positive".to_string(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        if request.expires_at <= now {
            return Err(StoreError::Rejected(
                "expiry must be in the future".to_string(),
            ));
        }

        let mut inner = self.inner.write().map_err(|e| {
            StoreError::provider(format!("failed to acquire write lock: {}", e))
        })?;
        inner.purge_expired(now);

        let id = Uuid::new_v4().to_string();
        let views_remaining = request.expires_after_views;
        inner.records.insert(
            id.clone(),
            StoredSecret {
                request,
                views_remaining,
            },
        );
        tracing::debug!("memory store: created shared secret {}", id);

        Ok(CreatedSharedSecret { id })
    }

    async fn fetch(&self, id: &str, hashed_hex: &str) -> Result<SharedSecretRecord, StoreError> {
        let mut inner = self.inner.write().map_err(|e| {
            StoreError::provider(format!("failed to acquire write lock: {}", e))
        })?;

        let now = OffsetDateTime::now_utc();
        let matches = |stored: &StoredSecret| {
            stored.request.hashed_hex.eq_ignore_ascii_case(hashed_hex)
        };
        // only a caller holding the right hash learns the record expired
        let expired = inner
            .records
            .get(id)
            .is_some_and(|stored| matches(stored) && stored.request.expires_at <= now);
        inner.purge_expired(now);
        if expired {
            return Err(StoreError::Expired(id.to_string()));
        }

        let stored = inner
            .records
            .get_mut(id)
            .filter(|stored| matches(&**stored))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let views_remaining = match stored.views_remaining {
            Some(views) => {
                let left = views.saturating_sub(1);
                stored.views_remaining = Some(left);
                Some(left)
            }
            None => None,
        };

        let record = SharedSecretRecord {
            encrypted_value: stored.request.encrypted_value.clone(),
            iv: stored.request.iv.clone(),
            tag: stored.request.tag.clone(),
            hashed_hex: Some(stored.request.hashed_hex.clone()),
            expires_at: Some(stored.request.expires_at),
            expires_after_views: Some(views_remaining.map(i64::from).unwrap_or(-1)),
            access_type: stored.request.access_type,
        };

        if views_remaining == Some(0) {
            inner.records.remove(id);
            tracing::debug!("memory store: view budget of {} exhausted", id);
        }

        Ok(record)
    }
}
