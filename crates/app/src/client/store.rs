use async_trait::async_trait;
use reqwest::StatusCode;

use common::store::{
    CreateSharedSecret, CreatedSharedSecret, SecretStore, SharedSecretRecord, StoreError,
};

use super::requests::{CreatePublicSecretRequest, CreateSecretRequest, FetchSecretRequest};
use super::{ApiClient, ApiError};

/// Secret store backed by the secret-sharing API
///
/// Public stores create through the unauthenticated endpoint and strip the
/// name and access type, the same way the public web form does.
#[derive(Debug, Clone)]
pub struct HttpSecretStore {
    client: ApiClient,
    public: bool,
}

impl HttpSecretStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            public: false,
        }
    }

    pub fn public(client: ApiClient) -> Self {
        Self {
            client,
            public: true,
        }
    }

    pub fn is_public(&self) -> bool {
        self.public
    }
}

fn create_error(err: ApiError) -> StoreError {
    match err {
        ApiError::HttpStatus(status, body) if status.is_client_error() => {
            StoreError::Rejected(format!("{}: {}", status, body))
        }
        ApiError::MissingToken => StoreError::Rejected(
            "an API token is required for organization shares, run `veil init --api-token` or share with --public"
                .to_string(),
        ),
        other => StoreError::provider(other),
    }
}

fn fetch_error(id: &str, err: ApiError) -> StoreError {
    match err.status() {
        Some(StatusCode::NOT_FOUND) => StoreError::NotFound(id.to_string()),
        Some(StatusCode::GONE) => StoreError::Expired(id.to_string()),
        _ => StoreError::provider(err),
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn create(
        &self,
        request: CreateSharedSecret,
    ) -> Result<CreatedSharedSecret, StoreError> {
        let created = if self.public {
            let request = CreateSharedSecret {
                name: String::new(),
                access_type: None,
                ..request
            };
            self.client.call(CreatePublicSecretRequest(request)).await
        } else {
            self.client.call(CreateSecretRequest(request)).await
        }
        .map_err(create_error)?;

        tracing::info!("created shared secret {}", created.id);
        Ok(created)
    }

    async fn fetch(&self, id: &str, hashed_hex: &str) -> Result<SharedSecretRecord, StoreError> {
        let response = self
            .client
            .call(FetchSecretRequest {
                id: id.to_string(),
                hashed_hex: hashed_hex.to_string(),
            })
            .await
            .map_err(|e| fetch_error(id, e))?;

        tracing::info!("fetched shared secret {}", id);
        Ok(response.into_record())
    }
}
