use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::random::{RandomError, RandomSource};

/// Size of a share key in bytes (128 bits of entropy)
pub const KEY_SIZE: usize = 16;
/// Length of the hex transport form of a share key
pub const KEY_HEX_LEN: usize = KEY_SIZE * 2;
/// Size of the AES-256 key material derived from a share key
pub const CIPHER_KEY_SIZE: usize = KEY_HEX_LEN;
/// Size of a SHA-256 lookup hash in bytes
pub const LOOKUP_HASH_SIZE: usize = 32;

/// Errors that can occur while generating or parsing keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key length, expected {expected} hex characters, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("key is not valid hex")]
    InvalidEncoding,
    #[error("invalid lookup hash")]
    InvalidHash,
    #[error("random error: {0}")]
    Random(#[from] RandomError),
}

/// The symmetric key that unlocks a shared secret
///
/// The key is only ever held by the creator and the viewer of a link. The
/// server sees its [`LookupHash`], never the key itself.
///
/// On the wire the key travels as 32 lowercase hex characters, and the
/// ASCII bytes of that hex string are the AES-256 key material. Links minted
/// by browser clients use the same convention, so either side can open the
/// other's links.
///
/// # Examples
///
/// ```ignore
/// let key = SymmetricKey::generate(&OsRandom)?;
/// let hash = key.lookup_hash();
///
/// // The hex form is what ends up in the share link
/// let parsed = SymmetricKey::from_hex(&key.to_hex())?;
/// assert!(hash.verify(&parsed));
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

impl From<[u8; KEY_SIZE]> for SymmetricKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        SymmetricKey(bytes)
    }
}

impl SymmetricKey {
    /// Generate a new key from the given random source
    pub fn generate<R: RandomSource + ?Sized>(random: &R) -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_SIZE];
        random.fill_bytes(&mut bytes)?;
        let key = Self(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Parse a key from its hex transport form
    ///
    /// Upper and lower case are both accepted. Anything other than exactly
    /// [`KEY_HEX_LEN`] hex characters is rejected; nothing is padded or
    /// truncated.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        if hex.len() != KEY_HEX_LEN {
            return Err(KeyError::InvalidLength {
                expected: KEY_HEX_LEN,
                got: hex.len(),
            });
        }
        let mut buff = [0u8; KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| KeyError::InvalidEncoding)?;
        let key = Self(buff);
        buff.zeroize();
        Ok(key)
    }

    /// Lowercase hex transport form of the key
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    /// The AES-256 key material: the ASCII bytes of the hex form
    pub fn cipher_key(&self) -> Zeroizing<[u8; CIPHER_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; CIPHER_KEY_SIZE]);
        // the output buffer is exactly twice the key size, so this cannot fail
        let _ = hex::encode_to_slice(self.0, out.as_mut_slice());
        out
    }

    /// Derive the non-secret lookup hash for this key
    pub fn lookup_hash(&self) -> LookupHash {
        LookupHash::derive(self)
    }
}

/// A one-way SHA-256 digest of a [`SymmetricKey`]
///
/// The storage service keeps this next to the ciphertext and uses it to
/// check that a viewer actually holds the link. It is safe to log and to
/// transmit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupHash([u8; LOOKUP_HASH_SIZE]);

impl LookupHash {
    /// Hash the hex transport form of `key`
    pub fn derive(key: &SymmetricKey) -> Self {
        let hex = key.to_hex();
        let digest = Sha256::digest(hex.as_bytes());
        let mut out = [0u8; LOOKUP_HASH_SIZE];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Parse a lookup hash from 64 hex characters
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let mut buff = [0u8; LOOKUP_HASH_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| KeyError::InvalidHash)?;
        Ok(Self(buff))
    }

    /// Lowercase hex form, as sent to the storage service
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether `key` hashes to this value
    pub fn verify(&self, key: &SymmetricKey) -> bool {
        Self::derive(key) == *self
    }

    /// Compare against a hex hash handed back by the storage service
    pub fn matches_hex(&self, hex: &str) -> bool {
        Self::from_hex(hex).map(|other| other == *self).unwrap_or(false)
    }
}

impl fmt::Display for LookupHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for LookupHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LookupHash({})", self.to_hex())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::crypto::random::{OsRandom, SeededRandom};

    #[test]
    fn test_generate_key_size() {
        let key = SymmetricKey::generate(&OsRandom).unwrap();
        assert_eq!(key.to_hex().len(), KEY_HEX_LEN);
        assert_eq!(key.cipher_key().len(), CIPHER_KEY_SIZE);
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = SymmetricKey::generate(&OsRandom).unwrap();
        let b = SymmetricKey::generate(&OsRandom).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_hex_roundtrip() {
        let key = SymmetricKey::generate(&SeededRandom::new(1)).unwrap();
        let parsed = SymmetricKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, parsed);

        let upper = key.to_hex().to_uppercase();
        assert_eq!(SymmetricKey::from_hex(&upper).unwrap(), key);
    }

    #[test]
    fn test_key_rejects_wrong_length() {
        let err = SymmetricKey::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidLength {
                expected: KEY_HEX_LEN,
                got: 4
            }
        );

        let too_long = "a".repeat(KEY_HEX_LEN + 2);
        assert!(SymmetricKey::from_hex(&too_long).is_err());
    }

    #[test]
    fn test_key_rejects_non_hex() {
        let bad = "z".repeat(KEY_HEX_LEN);
        assert_eq!(
            SymmetricKey::from_hex(&bad).unwrap_err(),
            KeyError::InvalidEncoding
        );
    }

    #[test]
    fn test_cipher_key_is_hex_ascii() {
        let key = SymmetricKey::from([0xab; KEY_SIZE]);
        let material = key.cipher_key();
        assert_eq!(&material[..], "ab".repeat(KEY_SIZE).as_bytes());
    }

    #[test]
    fn test_lookup_hash_matches_sha256_of_hex() {
        let key = SymmetricKey::from([0u8; KEY_SIZE]);
        let expected = hex::encode(Sha256::digest("0".repeat(KEY_HEX_LEN).as_bytes()));
        assert_eq!(key.lookup_hash().to_hex(), expected);
    }

    #[test]
    fn test_lookup_hash_deterministic() {
        let key = SymmetricKey::generate(&OsRandom).unwrap();
        assert_eq!(key.lookup_hash(), key.lookup_hash());
        assert_eq!(LookupHash::derive(&key.clone()), key.lookup_hash());
    }

    #[test]
    fn test_lookup_hash_no_collisions_in_sample() {
        let random = SeededRandom::new(42);
        let mut seen = HashSet::new();
        for _ in 0..512 {
            let key = SymmetricKey::generate(&random).unwrap();
            assert!(seen.insert(key.lookup_hash()));
        }
    }

    #[test]
    fn test_lookup_hash_verify() {
        let key = SymmetricKey::generate(&OsRandom).unwrap();
        let other = SymmetricKey::generate(&OsRandom).unwrap();
        let hash = key.lookup_hash();

        assert!(hash.verify(&key));
        assert!(!hash.verify(&other));
        assert!(hash.matches_hex(&hash.to_hex()));
        assert!(hash.matches_hex(&hash.to_hex().to_uppercase()));
        assert!(!hash.matches_hex("not-a-hash"));
    }

    #[test]
    fn test_lookup_hash_from_hex_rejects_garbage() {
        assert_eq!(LookupHash::from_hex("xyz").unwrap_err(), KeyError::InvalidHash);
        assert!(LookupHash::from_hex(&"ab".repeat(LOOKUP_HASH_SIZE - 1)).is_err());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = SymmetricKey::from([0x11; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "SymmetricKey(..)");
    }
}
