//! Share link construction and parsing
//!
//! A share link carries everything a viewer needs except the ciphertext:
//!
//! ```text
//! {origin}/shared/secret/{id}?key={hashedHex}-{key}&multi={true|false}
//! ```
//!
//! With [`KeyPlacement::Fragment`] the parameters move behind `#` instead,
//! where browsers never send them to the server. Parsing accepts either form.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

const LINK_PATH: [&str; 2] = ["shared", "secret"];
const KEY_PARAM: &str = "key";
const MULTI_PARAM: &str = "multi";
const KEY_SEPARATOR: char = '-';

// Everything but unreserved characters; `-` is encoded too since it
// separates the hash from the key.
const PARAM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid link origin: {0}")]
    InvalidOrigin(String),
    #[error("link has no secret id")]
    MissingId,
    #[error("secret id {0:?} cannot be used as a path segment")]
    InvalidId(String),
    #[error("link has no key parameter")]
    MissingKey,
    #[error("link key parameter has no separator")]
    MissingSeparator,
    #[error("link contains an invalid percent-encoded value")]
    InvalidEncoding,
    #[error("url parse error: {0}")]
    Parse(#[from] url::ParseError),
}

/// Where the key material goes in a built link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPlacement {
    /// `?key=..&multi=..`, readable by every viewer deployment
    #[default]
    Query,
    /// `#key=..&multi=..`, kept out of server logs and referrers
    Fragment,
}

/// The components of a share link
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub id: String,
    pub hashed_hex: String,
    pub key: Zeroizing<String>,
    pub is_multi: bool,
}

impl fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareLink")
            .field("id", &self.id)
            .field("hashed_hex", &self.hashed_hex)
            .field("key", &"..")
            .field("is_multi", &self.is_multi)
            .finish()
    }
}

/// Builds links under a fixed origin and parses links from any origin
#[derive(Debug, Clone)]
pub struct LinkCodec {
    origin: Url,
    placement: KeyPlacement,
}

impl LinkCodec {
    /// Create a codec for `origin`
    ///
    /// The origin may carry a path prefix (`https://host/app`); links are
    /// built underneath it. Any query or fragment on the origin is dropped.
    pub fn new(mut origin: Url) -> Result<Self, LinkError> {
        if origin.cannot_be_a_base() {
            return Err(LinkError::InvalidOrigin(format!(
                "{} is not a hierarchical URL",
                origin
            )));
        }
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(Self {
            origin,
            placement: KeyPlacement::default(),
        })
    }

    pub fn with_placement(mut self, placement: KeyPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn placement(&self) -> KeyPlacement {
        self.placement
    }

    /// Assemble the share link for `link`
    pub fn build(&self, link: &ShareLink) -> Result<Url, LinkError> {
        if link.id.is_empty() {
            return Err(LinkError::MissingId);
        }
        // url drops dot segments on push
        if link.id == "." || link.id == ".." {
            return Err(LinkError::InvalidId(link.id.clone()));
        }
        if link.key.is_empty() || link.hashed_hex.is_empty() {
            return Err(LinkError::MissingKey);
        }

        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LinkError::InvalidOrigin(format!("{} is not a hierarchical URL", self.origin))
            })?
            .pop_if_empty()
            .extend(LINK_PATH)
            .push(&link.id);

        let params = Zeroizing::new(format!(
            "{}={}{}{}&{}={}",
            KEY_PARAM,
            utf8_percent_encode(&link.hashed_hex, PARAM_VALUE),
            KEY_SEPARATOR,
            utf8_percent_encode(&link.key, PARAM_VALUE),
            MULTI_PARAM,
            link.is_multi,
        ));
        match self.placement {
            KeyPlacement::Query => url.set_query(Some(params.as_str())),
            KeyPlacement::Fragment => url.set_fragment(Some(params.as_str())),
        }
        Ok(url)
    }

    /// Split a share link back into its components
    ///
    /// Only the path and the parameters are inspected, so links minted under
    /// a different origin parse just the same. When both the query and the
    /// fragment carry a key, the query wins.
    pub fn parse(url: &Url) -> Result<ShareLink, LinkError> {
        let id = extract_id(url)?;

        let params = [url.query(), url.fragment()]
            .into_iter()
            .flatten()
            .map(LinkParams::from_raw)
            .find(|params| params.key.is_some())
            .ok_or(LinkError::MissingKey)?;
        let raw_key = params.key.ok_or(LinkError::MissingKey)?;

        let (hash, key) = raw_key
            .split_once(KEY_SEPARATOR)
            .ok_or(LinkError::MissingSeparator)?;
        let hashed_hex = decode_component(hash)?;
        let key = Zeroizing::new(decode_component(key)?);
        if hashed_hex.is_empty() || key.is_empty() {
            return Err(LinkError::MissingKey);
        }

        Ok(ShareLink {
            id,
            hashed_hex,
            key,
            is_multi: params.multi == Some("true"),
        })
    }

    pub fn parse_str(link: &str) -> Result<ShareLink, LinkError> {
        Self::parse(&Url::parse(link.trim())?)
    }
}

/// The two parameters we care about, borrowed from a raw query or fragment
#[derive(Default)]
struct LinkParams<'a> {
    key: Option<&'a str>,
    multi: Option<&'a str>,
}

impl<'a> LinkParams<'a> {
    // Split by hand: form decoding would turn `+` into a space
    fn from_raw(raw: &'a str) -> Self {
        let mut params = LinkParams::default();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            match name {
                KEY_PARAM if params.key.is_none() && !value.is_empty() => params.key = Some(value),
                MULTI_PARAM if params.multi.is_none() => params.multi = Some(value),
                _ => {}
            }
        }
        params
    }
}

fn extract_id(url: &Url) -> Result<String, LinkError> {
    let segments: Vec<&str> = url.path_segments().ok_or(LinkError::MissingId)?.collect();
    let position = segments
        .windows(LINK_PATH.len())
        .rposition(|window| window == LINK_PATH)
        .ok_or(LinkError::MissingId)?;
    let id = segments
        .get(position + LINK_PATH.len())
        .filter(|id| !id.is_empty())
        .ok_or(LinkError::MissingId)?;
    decode_component(id)
}

fn decode_component(raw: &str) -> Result<String, LinkError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| LinkError::InvalidEncoding)
}
