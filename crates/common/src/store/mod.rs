use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::policy::AccessType;

mod memory;

pub use memory::MemorySecretStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Transport or backend failure inside the store implementation
    #[error("unhandled secret store error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// No record with this id and hash
    #[error("shared secret {0} not found")]
    NotFound(String),
    /// The record existed but its lifetime or view budget ran out
    #[error("shared secret {0} has expired")]
    Expired(String),
    /// The store refused to accept a create request
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn provider<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Provider(err.into())
    }

    /// Whether the record is gone for good, as opposed to a failed call
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::Expired(_))
    }
}

/// Body of a create request
///
/// Carries the sealed secret and its lookup hash. The key that opens it is
/// never part of this payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSharedSecret {
    pub name: String,
    pub encrypted_value: String,
    pub hashed_hex: String,
    pub iv: String,
    pub tag: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Unset means unlimited views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_after_views: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSharedSecret {
    pub id: String,
}

/// A stored secret as handed back on fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSecretRecord {
    pub encrypted_value: String,
    pub iv: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_hex: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
    /// Views left after this one; `-1` or unset means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_after_views: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
}

impl SharedSecretRecord {
    /// Remaining views, `None` when the budget is unlimited
    pub fn views_remaining(&self) -> Option<u32> {
        self.expires_after_views
            .and_then(|views| u32::try_from(views).ok())
    }
}

/// Where sealed secrets are persisted
///
/// The store owns expiry, view budgets and access control. It only ever sees
/// ciphertext and lookup hashes.
#[async_trait]
pub trait SecretStore: Send + Sync + std::fmt::Debug {
    /// Persist a sealed secret
    ///
    /// # Returns
    /// * `Ok(CreatedSharedSecret)` - The id the store assigned to the record
    /// * `Err(StoreError::Rejected)` - The store refused the payload
    async fn create(&self, request: CreateSharedSecret)
        -> Result<CreatedSharedSecret, StoreError>;

    /// Fetch a sealed secret by id, proving possession of the link with its
    ///  lookup hash
    ///
    /// Every successful fetch counts as one view against the record's budget.
    ///
    /// Should fail with the following errors to be considered
    ///  correct:
    /// * `Err(StoreError::NotFound)` - No record matches the id and hash
    /// * `Err(StoreError::Expired)` - The record outlived its expiry or views
    async fn fetch(&self, id: &str, hashed_hex: &str) -> Result<SharedSecretRecord, StoreError>;
}

#[cfg(test)]
mod test {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_create_payload_shape() {
        let payload = CreateSharedSecret {
            name: String::new(),
            encrypted_value: "Y3Q=".to_string(),
            hashed_hex: "ab".repeat(32),
            iv: "aXY=".to_string(),
            tag: "dGFn".to_string(),
            expires_at: datetime!(2024-01-01 12:00 UTC),
            expires_after_views: None,
            access_type: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "",
                "encryptedValue": "Y3Q=",
                "hashedHex": "ab".repeat(32),
                "iv": "aXY=",
                "tag": "dGFn",
                "expiresAt": "2024-01-01T12:00:00Z",
            })
        );
    }

    #[test]
    fn test_create_payload_with_limits() {
        let payload = CreateSharedSecret {
            name: "deploy key".to_string(),
            encrypted_value: "Y3Q=".to_string(),
            hashed_hex: "00".repeat(32),
            iv: "aXY=".to_string(),
            tag: "dGFn".to_string(),
            expires_at: datetime!(2024-01-01 12:00 UTC),
            expires_after_views: Some(1),
            access_type: Some(AccessType::Organization),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["expiresAfterViews"], 1);
        assert_eq!(json["accessType"], "organization");
        assert!(json.get("key").is_none());
    }

    #[test]
    fn test_record_from_minimal_response() {
        let record: SharedSecretRecord =
            serde_json::from_str(r#"{"encryptedValue":"Y3Q=","iv":"aXY=","tag":"dGFn"}"#)
                .unwrap();
        assert_eq!(record.hashed_hex, None);
        assert_eq!(record.expires_at, None);
        assert_eq!(record.views_remaining(), None);
    }

    #[test]
    fn test_record_views_remaining() {
        let record: SharedSecretRecord = serde_json::from_str(
            r#"{"encryptedValue":"","iv":"","tag":"","expiresAt":"2024-01-01T12:00:00Z","expiresAfterViews":-1,"accessType":"anyone"}"#,
        )
        .unwrap();
        assert_eq!(record.views_remaining(), None);
        assert_eq!(record.expires_at, Some(datetime!(2024-01-01 12:00 UTC)));
        assert_eq!(record.access_type, Some(AccessType::Anyone));

        let limited = SharedSecretRecord {
            expires_after_views: Some(2),
            ..record
        };
        assert_eq!(limited.views_remaining(), Some(2));
    }

    #[test]
    fn test_store_error_not_found() {
        assert!(StoreError::NotFound("a".into()).is_not_found());
        assert!(StoreError::Expired("a".into()).is_not_found());
        assert!(!StoreError::provider("connection reset").is_not_found());
    }
}
