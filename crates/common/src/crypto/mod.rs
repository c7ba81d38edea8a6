//! Cryptographic primitives for veil share links
//!
//! This module provides everything a client needs to seal a secret so the
//! storage service cannot read it:
//!
//! - **Keys**: a random 128-bit [`SymmetricKey`] per shared secret, plus its
//!   SHA-256 [`LookupHash`]
//! - **Encryption**: AES-256-GCM via [`SymmetricCipher`], producing a
//!   [`SealedSecret`] of ciphertext, IV and tag
//! - **Randomness**: an injectable [`RandomSource`] so tests can pin keys and
//!   nonces
//!
//! # Security Model
//!
//! The storage service receives the ciphertext, IV, tag and lookup hash. It
//! never receives the key. The key and the hash only meet again inside the
//! share link, so whoever holds the link holds the secret, and nobody else
//! does, the service included.

mod cipher;
mod key;
mod random;

pub use cipher::{CipherError, SealedSecret, SymmetricCipher, IV_SIZE, TAG_SIZE};
pub use key::{
    KeyError, LookupHash, SymmetricKey, CIPHER_KEY_SIZE, KEY_HEX_LEN, KEY_SIZE, LOOKUP_HASH_SIZE,
};
pub use random::{OsRandom, RandomError, RandomSource, SeededRandom};
