//! Requests against the secret-sharing endpoints
//!
//! - `POST /api/v1/secret-sharing` creates an organization share (bearer token)
//! - `POST /api/v1/secret-sharing/public` creates a public share
//! - `GET /api/v1/secret-sharing/public/{id}?hashedHex=..` fetches a record,
//!   with the bearer token attached when one is configured

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use url::Url;

use common::store::{CreateSharedSecret, CreatedSharedSecret, SharedSecretRecord};

use super::{endpoint, ApiError, ApiRequest, TokenUse};

const SECRET_SHARING: [&str; 3] = ["api", "v1", "secret-sharing"];

fn secret_sharing(base_url: &Url, extra: &[&str]) -> Result<Url, ApiError> {
    let segments: Vec<&str> = SECRET_SHARING.iter().chain(extra).copied().collect();
    endpoint(base_url, &segments)
}

/// Create a share scoped to the caller's organization
#[derive(Debug, Clone)]
pub struct CreateSecretRequest(pub CreateSharedSecret);

impl ApiRequest for CreateSecretRequest {
    type Response = CreatedSharedSecret;

    const TOKEN: TokenUse = TokenUse::Required;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = secret_sharing(base_url, &[])?;
        Ok(client.post(full_url).json(&self.0))
    }
}

/// Create a share anyone holding the link can open
#[derive(Debug, Clone)]
pub struct CreatePublicSecretRequest(pub CreateSharedSecret);

impl ApiRequest for CreatePublicSecretRequest {
    type Response = CreatedSharedSecret;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = secret_sharing(base_url, &["public"])?;
        Ok(client.post(full_url).json(&self.0))
    }
}

#[derive(Debug, Clone)]
pub struct FetchSecretRequest {
    pub id: String,
    pub hashed_hex: String,
}

/// Some deployments wrap the record in a `secret` field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FetchSecretResponse {
    Wrapped { secret: SharedSecretRecord },
    Bare(SharedSecretRecord),
}

impl FetchSecretResponse {
    pub fn into_record(self) -> SharedSecretRecord {
        match self {
            FetchSecretResponse::Wrapped { secret } => secret,
            FetchSecretResponse::Bare(record) => record,
        }
    }
}

impl ApiRequest for FetchSecretRequest {
    type Response = FetchSecretResponse;

    // organization-scoped records need the caller's identity
    const TOKEN: TokenUse = TokenUse::IfPresent;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let mut full_url = secret_sharing(base_url, &["public", self.id.as_str()])?;
        full_url
            .query_pairs_mut()
            .append_pair("hashedHex", &self.hashed_hex);
        Ok(client.get(full_url))
    }
}
