//! Creating and opening share links
//!
//! [`ShareProtocol`] ties the pieces together. Sharing packs the secrets,
//! seals them under a fresh key, hands the sealed record to a
//! [`SecretStore`] and builds the link. Opening runs the same steps in
//! reverse. Each call awaits the store exactly once and never retries.

use std::fmt;

use time::OffsetDateTime;
use url::Url;

use crate::crypto::{
    CipherError, KeyError, LookupHash, OsRandom, RandomSource, SealedSecret, SymmetricCipher,
    SymmetricKey,
};
use crate::encoding::{EncodingError, SecretBundle};
use crate::link::{LinkCodec, LinkError, ShareLink};
use crate::policy::{AccessType, ExpiresIn, ViewLimit};
use crate::store::{CreateSharedSecret, SecretStore, StoreError};

/// Steps of a share, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    Packing,
    KeyGenerated,
    Encrypted,
    Persisted,
    LinkBuilt,
}

impl fmt::Display for CreateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            CreateStage::Packing => "packing",
            CreateStage::KeyGenerated => "key_generated",
            CreateStage::Encrypted => "encrypted",
            CreateStage::Persisted => "persisted",
            CreateStage::LinkBuilt => "link_built",
        };
        f.write_str(stage)
    }
}

/// Steps of an open, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStage {
    LinkParsed,
    Fetched,
    Decrypting,
    Unpacked,
}

impl fmt::Display for OpenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            OpenStage::LinkParsed => "link_parsed",
            OpenStage::Fetched => "fetched",
            OpenStage::Decrypting => "decrypting",
            OpenStage::Unpacked => "unpacked",
        };
        f.write_str(stage)
    }
}

/// Coarse classification of a failed share or open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller, e.g. no secrets or an empty value
    Validation,
    InvalidKey,
    InvalidIv,
    /// Tag did not verify, or the key does not match its hash
    Authentication,
    /// Plaintext or record fields could not be decoded
    Decode,
    MalformedLink,
    /// The record does not exist, expired, or ran out of views
    NotFound,
    /// The store failed for another reason
    Store,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("link key does not match its lookup hash")]
    HashMismatch,
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Encoding(e) if e.is_validation() => ErrorKind::Validation,
            ProtocolError::Encoding(_) => ErrorKind::Decode,
            ProtocolError::Key(KeyError::InvalidHash) => ErrorKind::MalformedLink,
            ProtocolError::Key(KeyError::Random(_)) => ErrorKind::Internal,
            ProtocolError::Key(_) => ErrorKind::InvalidKey,
            ProtocolError::Cipher(e) => match e {
                CipherError::InvalidKey { .. } => ErrorKind::InvalidKey,
                CipherError::InvalidIv { .. } => ErrorKind::InvalidIv,
                CipherError::Authentication => ErrorKind::Authentication,
                CipherError::InvalidUtf8 | CipherError::InvalidBase64(_) => ErrorKind::Decode,
                CipherError::Encrypt | CipherError::Random(_) => ErrorKind::Internal,
            },
            ProtocolError::Link(_) => ErrorKind::MalformedLink,
            ProtocolError::Store(e) if e.is_not_found() => ErrorKind::NotFound,
            ProtocolError::Store(_) => ErrorKind::Store,
            ProtocolError::HashMismatch => ErrorKind::Authentication,
        }
    }
}

/// The only error [`ShareProtocol`] hands back
///
/// The message is deliberately the same whatever went wrong. The cause is
/// available through [`std::error::Error::source`] and [`ShareError::kind`]
/// for logs and tests, and never contains key material or plaintext.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("failed to create shared secret")]
    Create(#[source] ProtocolError),
    #[error("failed to open shared secret")]
    Open(#[source] ProtocolError),
}

impl ShareError {
    pub fn kind(&self) -> ErrorKind {
        self.cause().kind()
    }

    pub fn cause(&self) -> &ProtocolError {
        match self {
            ShareError::Create(e) | ShareError::Open(e) => e,
        }
    }
}

/// What to share and for how long
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub bundle: SecretBundle,
    /// Label stored next to the record in plaintext, may be empty
    pub name: String,
    pub expires_in: ExpiresIn,
    pub view_limit: ViewLimit,
    /// Left unset for public shares
    pub access_type: Option<AccessType>,
}

impl ShareRequest {
    pub fn new(bundle: SecretBundle) -> Self {
        Self {
            bundle,
            name: String::new(),
            expires_in: ExpiresIn::default(),
            view_limit: ViewLimit::default(),
            access_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_expires_in(mut self, expires_in: ExpiresIn) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn with_view_limit(mut self, view_limit: ViewLimit) -> Self {
        self.view_limit = view_limit;
        self
    }

    pub fn with_access_type(mut self, access_type: Option<AccessType>) -> Self {
        self.access_type = access_type;
        self
    }
}

/// A freshly minted share link
#[derive(Clone)]
pub struct SharedLink {
    pub id: String,
    /// Carries the key; treat it like the secret itself
    pub url: Url,
    pub expires_at: OffsetDateTime,
}

impl fmt::Debug for SharedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLink")
            .field("id", &self.id)
            .field("url", &"..")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The contents of an opened link
#[derive(Debug, Clone)]
pub struct OpenedSecret {
    pub bundle: SecretBundle,
    pub expires_at: Option<OffsetDateTime>,
    /// `None` when the record has no view limit
    pub views_remaining: Option<u32>,
    pub access_type: Option<AccessType>,
}

/// Share and open secrets against a [`SecretStore`]
///
/// # Examples
///
/// ```ignore
/// let codec = LinkCodec::new(Url::parse("https://app.example.com")?)?;
/// let protocol = ShareProtocol::new(MemorySecretStore::new(), codec);
///
/// let request = ShareRequest::new(SecretBundle::multi(vec![
///     SecretPair::new("API_KEY", "abc123"),
/// ]))
/// .with_view_limit(ViewLimit::limited(1));
///
/// let shared = protocol.share(&request).await?;
/// let opened = protocol.open(&shared.url).await?;
/// ```
#[derive(Debug)]
pub struct ShareProtocol<S, R = OsRandom> {
    store: S,
    random: R,
    codec: LinkCodec,
}

impl<S: SecretStore> ShareProtocol<S, OsRandom> {
    pub fn new(store: S, codec: LinkCodec) -> Self {
        Self::with_random(store, codec, OsRandom)
    }
}

impl<S: SecretStore, R: RandomSource> ShareProtocol<S, R> {
    pub fn with_random(store: S, codec: LinkCodec, random: R) -> Self {
        Self {
            store,
            random,
            codec,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &LinkCodec {
        &self.codec
    }

    /// Seal `request` and persist it, returning the link that opens it
    ///
    /// Nothing is sent to the store if packing or encryption fails.
    pub async fn share(&self, request: &ShareRequest) -> Result<SharedLink, ShareError> {
        self.try_share(request).await.map_err(|e| {
            tracing::warn!(kind = ?e.kind(), "share failed: {}", e);
            ShareError::Create(e)
        })
    }

    /// Fetch and decrypt the secret behind `url`
    ///
    /// Counts as one view against the record's budget once the store has
    /// been reached.
    pub async fn open(&self, url: &Url) -> Result<OpenedSecret, ShareError> {
        self.try_open(url).await.map_err(|e| {
            tracing::warn!(kind = ?e.kind(), "open failed: {}", e);
            ShareError::Open(e)
        })
    }

    pub async fn open_str(&self, link: &str) -> Result<OpenedSecret, ShareError> {
        let url = Url::parse(link.trim())
            .map_err(|e| ShareError::Open(ProtocolError::Link(LinkError::Parse(e))))?;
        self.open(&url).await
    }

    async fn try_share(&self, request: &ShareRequest) -> Result<SharedLink, ProtocolError> {
        tracing::debug!(stage = %CreateStage::Packing, "share");
        let plaintext = request.bundle.to_plaintext()?;

        let key = SymmetricKey::generate(&self.random)?;
        let hash = key.lookup_hash();
        tracing::debug!(stage = %CreateStage::KeyGenerated, "share");

        let sealed = SymmetricCipher::from_key(&key)?.encrypt(plaintext.as_bytes(), &self.random)?;
        drop(plaintext);
        tracing::debug!(stage = %CreateStage::Encrypted, "share");

        let expires_at = request.expires_in.expires_at(OffsetDateTime::now_utc());
        let payload = CreateSharedSecret {
            name: request.name.clone(),
            encrypted_value: sealed.ciphertext_base64(),
            hashed_hex: hash.to_hex(),
            iv: sealed.iv_base64(),
            tag: sealed.tag_base64(),
            expires_at,
            expires_after_views: request.view_limit.expires_after_views(),
            access_type: request.access_type,
        };
        let created = self.store.create(payload).await?;
        tracing::debug!(stage = %CreateStage::Persisted, id = %created.id, "share");

        let url = self.codec.build(&ShareLink {
            id: created.id.clone(),
            hashed_hex: hash.to_hex(),
            key: key.to_hex(),
            is_multi: request.bundle.is_multi(),
        })?;
        tracing::debug!(stage = %CreateStage::LinkBuilt, id = %created.id, "share");

        Ok(SharedLink {
            id: created.id,
            url,
            expires_at,
        })
    }

    async fn try_open(&self, url: &Url) -> Result<OpenedSecret, ProtocolError> {
        let link = LinkCodec::parse(url)?;
        tracing::debug!(stage = %OpenStage::LinkParsed, id = %link.id, "open");

        let key = SymmetricKey::from_hex(&link.key)?;
        let hash = LookupHash::from_hex(&link.hashed_hex)?;
        if !hash.verify(&key) {
            return Err(ProtocolError::HashMismatch);
        }

        let record = self.store.fetch(&link.id, &hash.to_hex()).await?;
        tracing::debug!(stage = %OpenStage::Fetched, id = %link.id, "open");

        if let Some(stored) = record.hashed_hex.as_deref() {
            if !hash.matches_hex(stored) {
                return Err(ProtocolError::HashMismatch);
            }
        }

        tracing::debug!(stage = %OpenStage::Decrypting, id = %link.id, "open");
        let sealed = SealedSecret::from_base64(&record.encrypted_value, &record.iv, &record.tag)?;
        let plaintext = SymmetricCipher::from_key(&key)?.decrypt_to_string(&sealed)?;
        let bundle = SecretBundle::from_plaintext(&plaintext, link.is_multi)?;
        tracing::debug!(stage = %OpenStage::Unpacked, id = %link.id, "open");

        Ok(OpenedSecret {
            bundle,
            expires_at: record.expires_at,
            views_remaining: record.views_remaining(),
            access_type: record.access_type,
        })
    }
}
