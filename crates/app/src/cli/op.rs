use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use common::link::{LinkCodec, LinkError};
use veil::state::{AppState, StateError};
use veil::{ApiClient, ApiError};

/// Pick the API URL: explicit `--remote` flag, then the config file
pub fn resolve_remote(explicit: Option<Url>, state: &AppState) -> Url {
    explicit.unwrap_or_else(|| state.config.api_url.clone())
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Loaded state, or defaults when `veil init` has not been run
    pub state: AppState,
    /// Optional custom config path (defaults to ~/.veil)
    pub config_path: Option<PathBuf>,
    /// API the ops talk to
    pub api_url: Url,
}

impl OpContext {
    pub fn new(remote: Option<Url>, config_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state = AppState::load_or_default(config_path.clone())?;
        let api_url = resolve_remote(remote, &state);
        Ok(Self {
            state,
            config_path,
            api_url,
        })
    }

    pub fn client(&self) -> Result<ApiClient, ApiError> {
        let config = &self.state.config;
        ApiClient::new(
            &self.api_url,
            Duration::from_secs(config.request_timeout_secs),
            config.api_token.as_deref(),
        )
    }

    /// Codec for links built under the configured origin
    pub fn codec(&self) -> Result<LinkCodec, LinkError> {
        let config = &self.state.config;
        Ok(LinkCodec::new(config.link_origin.clone())?.with_placement(config.key_placement))
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::link::KeyPlacement;
    use tempfile::TempDir;
    use veil::AppConfig;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let temp = TempDir::new().unwrap();
        let state = AppState::load_or_default(Some(temp.path().to_path_buf())).unwrap();
        let explicit = Url::parse("http://example.com:9999").unwrap();
        assert_eq!(resolve_remote(Some(explicit.clone()), &state), explicit);
    }

    #[test]
    fn test_resolve_remote_falls_back_to_config() {
        let temp = TempDir::new().unwrap();
        let state = AppState::load_or_default(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(
            resolve_remote(None, &state).as_str(),
            "http://localhost:8080/"
        );
    }

    #[test]
    fn test_context_uses_initialized_config() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            api_url: Url::parse("https://api.example.com").unwrap(),
            link_origin: Url::parse("https://app.example.com").unwrap(),
            key_placement: KeyPlacement::Fragment,
            ..AppConfig::default()
        };
        AppState::init(Some(temp.path().to_path_buf()), Some(config)).unwrap();

        let ctx = OpContext::new(None, Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.api_url.as_str(), "https://api.example.com/");

        let codec = ctx.codec().unwrap();
        assert_eq!(codec.origin().as_str(), "https://app.example.com/");
        assert_eq!(codec.placement(), KeyPlacement::Fragment);
        assert!(!ctx.client().unwrap().has_token());
    }
}
