use std::fmt;
use std::path::PathBuf;

use clap::Args;
use url::Url;

use common::link::KeyPlacement;
use common::policy::{ExpiresIn, ViewLimit};
use veil::state::{AppConfig, AppState, StateError};

#[derive(Args, Clone)]
pub struct Init {
    /// Secret-sharing API base URL (default: --remote, or http://localhost:8080)
    #[arg(long)]
    pub api_url: Option<Url>,

    /// Origin share links are built under (default: the API URL)
    #[arg(long)]
    pub link_origin: Option<Url>,

    /// Bearer token used for organization shares
    #[arg(long)]
    pub api_token: Option<String>,

    /// Carry the key in the link fragment instead of the query
    #[arg(long)]
    pub fragment: bool,

    /// Default expiry for new shares (5m, 30m, 1h, 1d, 7d, 14d, 30d)
    #[arg(long)]
    pub expires_in: Option<ExpiresIn>,

    /// Default view limit for new shares, a number or `unlimited`
    #[arg(long)]
    pub views: Option<ViewLimit>,

    /// Directory for log files, relative paths live under the config directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for Init {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Init")
            .field("api_url", &self.api_url)
            .field("link_origin", &self.link_origin)
            .field("api_token", &self.api_token.as_ref().map(|_| ".."))
            .field("fragment", &self.fragment)
            .field("expires_in", &self.expires_in)
            .field("views", &self.views)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

impl Init {
    fn config(&self, api_url: &Url) -> AppConfig {
        let api_url = self.api_url.clone().unwrap_or_else(|| api_url.clone());
        let defaults = AppConfig::default();
        AppConfig {
            link_origin: self.link_origin.clone().unwrap_or_else(|| api_url.clone()),
            api_url,
            api_token: self.api_token.clone(),
            key_placement: if self.fragment {
                KeyPlacement::Fragment
            } else {
                KeyPlacement::Query
            },
            default_expires_in: self.expires_in.unwrap_or(defaults.default_expires_in),
            default_view_limit: self.views.unwrap_or(defaults.default_view_limit),
            log_dir: self.log_dir.clone(),
            ..defaults
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = self.config(&ctx.api_url);
        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        tracing::info!("initialized {}", state.config_path.display());

        let output = format!(
            "Initialized veil directory at: {}\n\
             - Config: {}\n\
             - API URL: {}\n\
             - Link origin: {}\n\
             - API token: {}\n\
             - Key placement: {:?}\n\
             - Default expiry: {}\n\
             - Default views: {}",
            state.veil_dir.display(),
            state.config_path.display(),
            state.config.api_url,
            state.config.link_origin,
            if state.config.api_token.is_some() {
                "set"
            } else {
                "not set (public shares only)"
            },
            state.config.key_placement,
            state.config.default_expires_in,
            state.config.default_view_limit,
        );

        Ok(output)
    }
}
