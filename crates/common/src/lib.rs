/**
 * Cryptographic types and operations.
 *  - Per-link symmetric keys and their lookup hashes
 *  - AES-256-GCM sealing of secrets
 *  - Injectable randomness
 */
pub mod crypto;
/**
 * Packing of several named secrets into a single
 *  plaintext, and the single/multi bundle that
 *  decides whether a link uses it.
 */
pub mod encoding;
/**
 * Building and parsing share links, the only
 *  place the key and its hash travel together.
 */
pub mod link;
/**
 * Expiry, view limit and access presets sent
 *  alongside a sealed secret.
 */
pub mod policy;
/**
 * The share / open orchestration and the single
 *  error type callers see.
 */
pub mod protocol;
/**
 * Seam to whatever persists sealed secrets,
 *  plus an in-memory implementation.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{LookupHash, OsRandom, RandomSource, SymmetricKey};
    pub use crate::encoding::{SecretBundle, SecretPair};
    pub use crate::link::{KeyPlacement, LinkCodec, ShareLink};
    pub use crate::policy::{AccessType, ExpiresIn, ViewLimit};
    pub use crate::protocol::{
        ErrorKind, OpenedSecret, ShareError, ShareProtocol, ShareRequest, SharedLink,
    };
    pub use crate::store::{MemorySecretStore, SecretStore, StoreError};
    pub use crate::version::build_info;
}
