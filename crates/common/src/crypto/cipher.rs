//! Authenticated encryption using AES-256-GCM
//!
//! A shared secret is sealed into three parts that the storage service keeps
//! side by side: the ciphertext, the 12-byte IV and the 16-byte GCM tag. The
//! tag is kept apart from the ciphertext to match the storage service's
//! record layout, but it is verified before a single plaintext byte is
//! released.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zeroize::Zeroizing;

use super::key::{SymmetricKey, CIPHER_KEY_SIZE};
use super::random::{RandomError, RandomSource};

/// Size of the AES-GCM IV in bytes
pub const IV_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("invalid key size, expected {expected} bytes, got {got}")]
    InvalidKey { expected: usize, got: usize },
    #[error("invalid iv size, expected {expected} bytes, got {got}")]
    InvalidIv { expected: usize, got: usize },
    #[error("authentication failed")]
    Authentication,
    #[error("decrypted data is not valid utf-8")]
    InvalidUtf8,
    #[error("{0} is not valid base64")]
    InvalidBase64(&'static str),
    #[error("encryption failed")]
    Encrypt,
    #[error("random error: {0}")]
    Random(#[from] RandomError),
}

/// The output of [`SymmetricCipher::encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
}

impl SealedSecret {
    /// Decode the base64 fields of a storage record
    ///
    /// Sizes are not checked here; [`SymmetricCipher::decrypt`] rejects a
    /// wrong IV or tag length before touching the cipher.
    pub fn from_base64(ciphertext: &str, iv: &str, tag: &str) -> Result<Self, CipherError> {
        Ok(Self {
            ciphertext: STANDARD
                .decode(ciphertext)
                .map_err(|_| CipherError::InvalidBase64("ciphertext"))?,
            iv: STANDARD
                .decode(iv)
                .map_err(|_| CipherError::InvalidBase64("iv"))?,
            tag: STANDARD
                .decode(tag)
                .map_err(|_| CipherError::InvalidBase64("tag"))?,
        })
    }

    pub fn ciphertext_base64(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }

    pub fn iv_base64(&self) -> String {
        STANDARD.encode(&self.iv)
    }

    pub fn tag_base64(&self) -> String {
        STANDARD.encode(&self.tag)
    }
}

/// AES-256-GCM bound to a single key
///
/// # Examples
///
/// ```ignore
/// let key = SymmetricKey::generate(&OsRandom)?;
/// let cipher = SymmetricCipher::from_key(&key)?;
///
/// let sealed = cipher.encrypt(b"hunter2", &OsRandom)?;
/// let opened = cipher.decrypt(&sealed.ciphertext, &sealed.iv, &sealed.tag)?;
/// assert_eq!(&opened[..], b"hunter2");
/// ```
pub struct SymmetricCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricCipher(..)")
    }
}

impl SymmetricCipher {
    /// Create a cipher from raw key material
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] unless `key` is exactly
    /// [`CIPHER_KEY_SIZE`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != CIPHER_KEY_SIZE {
            return Err(CipherError::InvalidKey {
                expected: CIPHER_KEY_SIZE,
                got: key.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey {
            expected: CIPHER_KEY_SIZE,
            got: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// Create a cipher keyed by a share key
    pub fn from_key(key: &SymmetricKey) -> Result<Self, CipherError> {
        Self::new(key.cipher_key().as_slice())
    }

    /// Encrypt `plaintext` under a fresh random IV
    ///
    /// Every call draws a new IV from `random`, so sealing the same plaintext
    /// twice never reuses a nonce.
    pub fn encrypt<R: RandomSource + ?Sized>(
        &self,
        plaintext: &[u8],
        random: &R,
    ) -> Result<SealedSecret, CipherError> {
        let mut iv = [0u8; IV_SIZE];
        random.fill_bytes(&mut iv)?;

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), &[], &mut buffer)
            .map_err(|_| CipherError::Encrypt)?;

        Ok(SealedSecret {
            ciphertext: buffer,
            iv: iv.to_vec(),
            tag: tag.to_vec(),
        })
    }

    /// Verify and decrypt a sealed secret
    ///
    /// # Errors
    ///
    /// - [`CipherError::InvalidIv`] if `iv` is not [`IV_SIZE`] bytes
    /// - [`CipherError::Authentication`] if the tag has the wrong size or does
    ///   not verify (wrong key, corrupted ciphertext or tampering)
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        tag: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        if iv.len() != IV_SIZE {
            return Err(CipherError::InvalidIv {
                expected: IV_SIZE,
                got: iv.len(),
            });
        }
        if tag.len() != TAG_SIZE {
            return Err(CipherError::Authentication);
        }

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(iv),
                &[],
                buffer.as_mut_slice(),
                Tag::from_slice(tag),
            )
            .map_err(|_| CipherError::Authentication)?;

        Ok(buffer)
    }

    /// Decrypt a sealed secret and interpret the plaintext as UTF-8
    pub fn decrypt_to_string(&self, sealed: &SealedSecret) -> Result<Zeroizing<String>, CipherError> {
        let plaintext = self.decrypt(&sealed.ciphertext, &sealed.iv, &sealed.tag)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| CipherError::InvalidUtf8)?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}
