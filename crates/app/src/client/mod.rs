use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

mod client;
mod error;
pub mod requests;
mod store;

pub use client::ApiClient;
pub use error::ApiError;
pub use store::HttpSecretStore;

/// How a request uses the configured bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUse {
    /// Never sent
    Never,
    /// Sent when the client has one
    IfPresent,
    /// The call fails with [`ApiError::MissingToken`] without one
    Required,
}

/// A single call against the secret-sharing API
pub trait ApiRequest {
    type Response: DeserializeOwned;

    const TOKEN: TokenUse = TokenUse::Never;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}

/// Append `segments` to the path of `base_url`, keeping any prefix it has
pub(crate) fn endpoint(base_url: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments() {
        let base = Url::parse("https://api.example.com").unwrap();
        let url = endpoint(&base, &["api", "v1", "secret-sharing"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/secret-sharing");
    }

    #[test]
    fn test_endpoint_keeps_prefix() {
        let base = Url::parse("https://example.com/secrets/").unwrap();
        let url = endpoint(&base, &["api", "v1"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/secrets/api/v1");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let base = Url::parse("https://api.example.com").unwrap();
        let url = endpoint(&base, &["public", "a/b"]).unwrap();
        assert_eq!(url.path(), "/public/a%2Fb");
    }
}
