use std::fmt;

use clap::Args;

use common::encoding::SecretBundle;
use common::link::LinkError;
use common::protocol::{OpenedSecret, ShareError, ShareProtocol};
use veil::{ApiError, HttpSecretStore};

#[derive(Args, Clone)]
pub struct Open {
    /// Share link to open; counts as one view
    pub link: String,

    /// Print the secrets as JSON; pairs become an ordered array
    #[arg(long)]
    pub json: bool,
}

impl fmt::Debug for Open {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Open")
            .field("link", &"..")
            .field("json", &self.json)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenOpError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Open(#[from] ShareError),
    #[error("failed to render secrets: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct OpenOutput {
    pub bundle: SecretBundle,
    pub views_remaining: Option<u32>,
    rendered: Option<String>,
}

impl fmt::Debug for OpenOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOutput")
            .field("bundle", &self.bundle)
            .field("views_remaining", &self.views_remaining)
            .finish_non_exhaustive()
    }
}

impl OpenOutput {
    fn new(opened: OpenedSecret, json: bool) -> Result<Self, serde_json::Error> {
        let rendered = if json {
            Some(render_json(&opened.bundle)?)
        } else {
            None
        };
        Ok(Self {
            bundle: opened.bundle,
            views_remaining: opened.views_remaining,
            rendered,
        })
    }
}

/// Single values render as `{"value": ..}`. Pairs render as an array of
/// `{"name": .., "value": ..}` in bundle order, so repeated and unnamed
/// pairs survive.
fn render_json(bundle: &SecretBundle) -> Result<String, serde_json::Error> {
    let rendered = match bundle {
        SecretBundle::Single(value) => serde_json::json!({ "value": value.as_str() }),
        SecretBundle::Multi(pairs) => pairs
            .iter()
            .map(|pair| {
                serde_json::json!({ "name": pair.name.as_str(), "value": pair.value.as_str() })
            })
            .collect(),
    };
    serde_json::to_string_pretty(&rendered)
}

impl fmt::Display for OpenOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rendered) = &self.rendered {
            return f.write_str(rendered);
        }
        match &self.bundle {
            SecretBundle::Single(value) => f.write_str(value),
            SecretBundle::Multi(pairs) => {
                let lines: Vec<String> = pairs
                    .iter()
                    .map(|pair| {
                        if pair.name.is_empty() {
                            pair.value.clone()
                        } else {
                            format!("{}={}", pair.name, pair.value)
                        }
                    })
                    .collect();
                f.write_str(&lines.join("\n"))
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Open {
    type Error = OpenOpError;
    type Output = OpenOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = HttpSecretStore::new(ctx.client()?);
        // links built under any origin open the same way
        let opened = ShareProtocol::new(store, ctx.codec()?).open_str(&self.link).await?;

        if let Some(views) = opened.views_remaining {
            tracing::info!("{} view(s) left on this link", views);
        }
        Ok(OpenOutput::new(opened, self.json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::crypto::CipherError;
    use common::encoding::SecretPair;
    use common::protocol::ProtocolError;
    use common::store::StoreError;

    fn output(bundle: SecretBundle, json: bool) -> OpenOutput {
        OpenOutput::new(
            OpenedSecret {
                bundle,
                expires_at: None,
                views_remaining: Some(0),
                access_type: None,
            },
            json,
        )
        .unwrap()
    }

    #[test]
    fn test_single_prints_raw_value() {
        let out = output(SecretBundle::single("hunter2"), false);
        assert_eq!(out.to_string(), "hunter2");
        assert!(!format!("{:?}", out).contains("hunter2"));
    }

    #[test]
    fn test_multi_prints_env_lines() {
        let out = output(
            SecretBundle::multi(vec![
                SecretPair::new("API_KEY", "abc123"),
                SecretPair::unnamed("loose"),
            ]),
            false,
        );
        assert_eq!(out.to_string(), "API_KEY=abc123\nloose");
    }

    #[test]
    fn test_json_output() {
        let out = output(
            SecretBundle::multi(vec![
                SecretPair::new("API_KEY", "abc123"),
                SecretPair::new("DB_URL", "postgres://x"),
            ]),
            true,
        );
        assert!(!format!("{:?}", out).contains("abc123"));
        let parsed: serde_json::Value = serde_json::from_str(&out.to_string()).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                { "name": "API_KEY", "value": "abc123" },
                { "name": "DB_URL", "value": "postgres://x" },
            ])
        );

        let out = output(SecretBundle::single("hunter2"), true);
        let parsed: serde_json::Value = serde_json::from_str(&out.to_string()).unwrap();
        assert_eq!(parsed, serde_json::json!({ "value": "hunter2" }));
    }

    #[test]
    fn test_json_keeps_repeated_and_unnamed_pairs() {
        let out = output(
            SecretBundle::multi(vec![
                SecretPair::new("TOKEN", "first"),
                SecretPair::new("TOKEN", "second"),
                SecretPair::unnamed("a"),
                SecretPair::unnamed("b"),
            ]),
            true,
        );
        let parsed: serde_json::Value = serde_json::from_str(&out.to_string()).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                { "name": "TOKEN", "value": "first" },
                { "name": "TOKEN", "value": "second" },
                { "name": "", "value": "a" },
                { "name": "", "value": "b" },
            ])
        );
    }

    #[test]
    fn test_open_failures_read_the_same() {
        let failures = [
            ProtocolError::HashMismatch,
            ProtocolError::Store(StoreError::NotFound("abc".into())),
            ProtocolError::Cipher(CipherError::Authentication),
        ];
        for cause in failures {
            let err = OpenOpError::from(ShareError::Open(cause));
            assert_eq!(err.to_string(), "failed to open shared secret");
        }
    }
}
