//! Packing of several named secrets into one plaintext blob
//!
//! Each name and value is base64-encoded on its own (standard alphabet, no
//! padding), the two are joined with `__`, and pairs are joined with `|||`.
//! The standard alphabet never produces `_` or `|`, so splitting the blob
//! back apart is unambiguous.
//!
//! ```text
//! [("API_KEY", "abc123"), ("DB", "pw")]
//!   -> "QVBJX0tFWQ__YWJjMTIz|||REI__cHc"
//! ```

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Separates the encoded name from the encoded value
pub const FIELD_DELIMITER: &str = "__";
/// Separates encoded pairs from each other
pub const ITEM_DELIMITER: &str = "|||";

// Emits unpadded output but accepts padded input from older clients
const FIELD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("at least one secret is required")]
    Empty,
    #[error("secret {0} has an empty value")]
    EmptyValue(usize),
    #[error("item {0} does not have exactly two fields")]
    MalformedItem(usize),
    #[error("item {0} contains a field that is not valid base64")]
    InvalidBase64(usize),
    #[error("item {0} contains a field that is not valid utf-8")]
    InvalidUtf8(usize),
}

impl EncodingError {
    /// Whether the error was caused by bad caller input rather than a bad blob
    pub fn is_validation(&self) -> bool {
        matches!(self, EncodingError::Empty | EncodingError::EmptyValue(_))
    }
}

/// A single named secret
///
/// The name may be empty; the value may not.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretPair {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for SecretPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPair")
            .field("name", &self.name)
            .field("value", &"..")
            .finish()
    }
}

impl SecretPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn unnamed(value: impl Into<String>) -> Self {
        Self::new(String::new(), value)
    }
}

/// Pack an ordered list of secrets into a single blob
///
/// # Errors
///
/// - [`EncodingError::Empty`] if `secrets` is empty
/// - [`EncodingError::EmptyValue`] if any value is empty
pub fn pack(secrets: &[SecretPair]) -> Result<Zeroizing<String>, EncodingError> {
    if secrets.is_empty() {
        return Err(EncodingError::Empty);
    }
    if let Some(index) = secrets.iter().position(|s| s.value.is_empty()) {
        return Err(EncodingError::EmptyValue(index));
    }

    let mut blob = Zeroizing::new(String::new());
    for (index, secret) in secrets.iter().enumerate() {
        if index > 0 {
            blob.push_str(ITEM_DELIMITER);
        }
        blob.push_str(&FIELD_ENGINE.encode(secret.name.as_bytes()));
        blob.push_str(FIELD_DELIMITER);
        let value = Zeroizing::new(FIELD_ENGINE.encode(secret.value.as_bytes()));
        blob.push_str(&value);
    }
    Ok(blob)
}

/// Reverse [`pack`]
///
/// A blob produced by [`pack`] always unpacks. Any error here means the
/// plaintext was corrupted or forged.
pub fn unpack(blob: &str) -> Result<Vec<SecretPair>, EncodingError> {
    blob.split(ITEM_DELIMITER)
        .enumerate()
        .map(|(index, item)| {
            let mut fields = item.split(FIELD_DELIMITER);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(value), None) => Ok(SecretPair {
                    name: decode_field(index, name)?,
                    value: decode_field(index, value)?,
                }),
                _ => Err(EncodingError::MalformedItem(index)),
            }
        })
        .collect()
}

fn decode_field(index: usize, field: &str) -> Result<String, EncodingError> {
    let bytes = FIELD_ENGINE
        .decode(field)
        .map_err(|_| EncodingError::InvalidBase64(index))?;
    String::from_utf8(bytes).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        EncodingError::InvalidUtf8(index)
    })
}

/// What a link carries: one raw value, or a packed list of named secrets
///
/// A single value is encrypted as-is and linked with `multi=false`, which
/// keeps those links readable by viewers that predate packing.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretBundle {
    Single(Zeroizing<String>),
    Multi(Vec<SecretPair>),
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretBundle::Single(_) => f.write_str("Single(..)"),
            SecretBundle::Multi(pairs) => f.debug_tuple("Multi").field(pairs).finish(),
        }
    }
}

impl SecretBundle {
    pub fn single(value: impl Into<String>) -> Self {
        SecretBundle::Single(Zeroizing::new(value.into()))
    }

    pub fn multi(pairs: Vec<SecretPair>) -> Self {
        SecretBundle::Multi(pairs)
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, SecretBundle::Multi(_))
    }

    /// The plaintext that gets encrypted for this bundle
    pub fn to_plaintext(&self) -> Result<Zeroizing<String>, EncodingError> {
        match self {
            SecretBundle::Single(value) if value.is_empty() => Err(EncodingError::EmptyValue(0)),
            SecretBundle::Single(value) => Ok(value.clone()),
            SecretBundle::Multi(pairs) => pack(pairs),
        }
    }

    /// Rebuild a bundle from decrypted plaintext
    pub fn from_plaintext(plaintext: &str, is_multi: bool) -> Result<Self, EncodingError> {
        if is_multi {
            unpack(plaintext).map(SecretBundle::Multi)
        } else {
            Ok(SecretBundle::single(plaintext))
        }
    }

    /// Flatten into pairs; a single value becomes one unnamed pair
    pub fn pairs(&self) -> Vec<SecretPair> {
        match self {
            SecretBundle::Single(value) => vec![SecretPair::unnamed(value.as_str())],
            SecretBundle::Multi(pairs) => pairs.clone(),
        }
    }
}
