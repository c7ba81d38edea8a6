//! A stand-in for the secret-sharing API, served over real HTTP
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use url::Url;

use common::link::LinkCodec;
use common::protocol::ShareProtocol;
use common::store::{CreateSharedSecret, MemorySecretStore, SecretStore, StoreError};
use veil::{ApiClient, HttpSecretStore};

pub const TOKEN: &str = "st.test-token";
pub const ORIGIN: &str = "https://app.example.com";

#[derive(Clone, Default)]
pub struct FakeApi {
    pub store: MemorySecretStore,
    /// Wrap fetch responses in a `secret` field
    pub wrap_fetch: bool,
    pub public_creates: Arc<AtomicUsize>,
    pub org_creates: Arc<AtomicUsize>,
    pub fetches: Arc<AtomicUsize>,
    /// Fetches that carried the expected bearer token
    pub token_fetches: Arc<AtomicUsize>,
}

impl FakeApi {
    pub fn public_creates(&self) -> usize {
        self.public_creates.load(Ordering::SeqCst)
    }

    pub fn org_creates(&self) -> usize {
        self.org_creates.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn token_fetches(&self) -> usize {
        self.token_fetches.load(Ordering::SeqCst)
    }
}

struct ApiFailure(StoreError);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Expired(_) => StatusCode::GONE,
            StoreError::Rejected(_) => StatusCode::BAD_REQUEST,
            StoreError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(Deserialize)]
struct FetchParams {
    #[serde(rename = "hashedHex")]
    hashed_hex: String,
}

fn has_token(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TOKEN);
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

async fn create_org(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(req): Json<CreateSharedSecret>,
) -> Response {
    if !has_token(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing or bad token").into_response();
    }

    api.org_creates.fetch_add(1, Ordering::SeqCst);
    match api.store.create(req).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => ApiFailure(e).into_response(),
    }
}

async fn create_public(
    State(api): State<FakeApi>,
    Json(req): Json<CreateSharedSecret>,
) -> Response {
    api.public_creates.fetch_add(1, Ordering::SeqCst);
    match api.store.create(req).await {
        Ok(created) => Json(created).into_response(),
        Err(e) => ApiFailure(e).into_response(),
    }
}

async fn fetch(
    State(api): State<FakeApi>,
    Path(id): Path<String>,
    Query(params): Query<FetchParams>,
    headers: HeaderMap,
) -> Response {
    api.fetches.fetch_add(1, Ordering::SeqCst);
    if has_token(&headers) {
        api.token_fetches.fetch_add(1, Ordering::SeqCst);
    }
    match api.store.fetch(&id, &params.hashed_hex).await {
        Ok(record) if api.wrap_fetch => {
            Json(serde_json::json!({ "secret": record })).into_response()
        }
        Ok(record) => Json(record).into_response(),
        Err(e) => ApiFailure(e).into_response(),
    }
}

/// Serve `api` on an ephemeral local port and return its base URL
pub async fn spawn_api(api: FakeApi) -> Url {
    let router = Router::new()
        .route("/api/v1/secret-sharing", post(create_org))
        .route("/api/v1/secret-sharing/public", post(create_public))
        .route("/api/v1/secret-sharing/public/:id", get(fetch))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Url::parse(&format!("http://{}", addr)).unwrap()
}

pub fn client(remote: &Url, token: Option<&str>) -> ApiClient {
    ApiClient::new(remote, Duration::from_secs(5), token).unwrap()
}

pub fn codec() -> LinkCodec {
    LinkCodec::new(Url::parse(ORIGIN).unwrap()).unwrap()
}

pub fn protocol(store: HttpSecretStore) -> ShareProtocol<HttpSecretStore> {
    ShareProtocol::new(store, codec())
}
