use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use url::Url;

use super::error::ApiError;
use super::{ApiRequest, TokenUse};

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
    token: Option<HeaderValue>,
}

impl ApiClient {
    pub fn new(remote: &Url, timeout: Duration, token: Option<&str>) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        let token = token
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidToken)?;
                value.set_sensitive(true);
                Ok::<_, ApiError>(value)
            })
            .transpose()?;

        Ok(Self {
            remote: remote.clone(),
            client,
            token,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let mut request_builder = request.build_request(&self.remote, &self.client)?;
        if let Some(token) = self.token_for(T::TOKEN)? {
            request_builder = request_builder.header(AUTHORIZATION, token);
        }
        let response = request_builder.send().await?;

        if response.status().is_success() {
            Ok(response.json::<T::Response>().await?)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    fn token_for(&self, usage: TokenUse) -> Result<Option<HeaderValue>, ApiError> {
        match usage {
            TokenUse::Never => Ok(None),
            TokenUse::IfPresent => Ok(self.token.clone()),
            TokenUse::Required => self.token.clone().map(Some).ok_or(ApiError::MissingToken),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }
}
