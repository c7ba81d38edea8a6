use std::fmt;
use std::str::FromStr;

use clap::Args;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::io::AsyncReadExt;

use common::encoding::{SecretBundle, SecretPair};
use common::link::{LinkCodec, LinkError};
use common::policy::{AccessType, ExpiresIn, ViewLimit};
use common::protocol::{ShareError, ShareProtocol, ShareRequest, SharedLink};
use common::store::{MemorySecretStore, SecretStore};
use veil::{ApiError, HttpSecretStore};

/// A `NAME=VALUE` secret given on the command line
#[derive(Clone)]
pub struct SecretArg(pub SecretPair);

impl FromStr for SecretArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| "expected NAME=VALUE".to_string())?;
        if value.is_empty() {
            return Err(format!("secret {:?} has an empty value", name));
        }
        Ok(SecretArg(SecretPair::new(name.trim(), value)))
    }
}

impl fmt::Debug for SecretArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[derive(Args, Clone)]
pub struct Share {
    /// Value to share as a single secret; read from stdin when no secret is given
    #[arg(long, conflicts_with = "secrets")]
    pub value: Option<String>,

    /// Named secret as NAME=VALUE, repeat to put several behind one link
    #[arg(long = "secret", value_name = "NAME=VALUE")]
    pub secrets: Vec<SecretArg>,

    /// Label stored in plaintext next to the record
    #[arg(long)]
    pub name: Option<String>,

    /// How long the link stays valid (5m, 30m, 1h, 1d, 7d, 14d, 30d)
    #[arg(long)]
    pub expires_in: Option<ExpiresIn>,

    /// How many times the link may be opened, a number or `unlimited`
    #[arg(long)]
    pub views: Option<ViewLimit>,

    /// Who may open the link (anyone, organization)
    #[arg(long, conflicts_with = "public")]
    pub access: Option<AccessType>,

    /// Create through the public endpoint, no API token needed
    #[arg(long)]
    pub public: bool,

    /// Seal and build the link locally without contacting the API
    #[arg(long)]
    pub dry_run: bool,
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("value", &self.value.as_ref().map(|_| ".."))
            .field("secrets", &self.secrets)
            .field("name", &self.name)
            .field("expires_in", &self.expires_in)
            .field("views", &self.views)
            .field("access", &self.access)
            .field("public", &self.public)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShareOpError {
    #[error("failed to read secret from stdin: {0}")]
    Stdin(#[from] std::io::Error),
    #[error("no secret given on the command line or stdin")]
    NothingToShare,
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Share(#[from] ShareError),
}

pub struct ShareOutput {
    pub link: SharedLink,
    pub dry_run: bool,
}

impl fmt::Debug for ShareOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareOutput")
            .field("link", &self.link)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl fmt::Display for ShareOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.link.url)?;
        if self.dry_run {
            write!(f, "\n(dry run, nothing was stored)")?;
        }
        Ok(())
    }
}

/// Drop the line ending a shell pipe leaves behind
fn strip_newline(mut input: String) -> String {
    if input.ends_with('\n') {
        input.pop();
        if input.ends_with('\r') {
            input.pop();
        }
    }
    input
}

async fn read_stdin() -> Result<String, std::io::Error> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    Ok(strip_newline(input))
}

async fn share_with<S: SecretStore>(
    store: S,
    codec: LinkCodec,
    request: &ShareRequest,
) -> Result<SharedLink, ShareError> {
    ShareProtocol::new(store, codec).share(request).await
}

impl Share {
    async fn bundle(&self) -> Result<SecretBundle, ShareOpError> {
        if !self.secrets.is_empty() {
            let pairs = self.secrets.iter().map(|s| s.0.clone()).collect();
            return Ok(SecretBundle::multi(pairs));
        }
        let value = match &self.value {
            Some(value) => value.clone(),
            None => read_stdin().await?,
        };
        if value.is_empty() {
            return Err(ShareOpError::NothingToShare);
        }
        Ok(SecretBundle::single(value))
    }

    fn access_type(&self) -> Option<AccessType> {
        if self.public {
            None
        } else {
            Some(self.access.unwrap_or_default())
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Share {
    type Error = ShareOpError;
    type Output = ShareOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = &ctx.state.config;
        let request = ShareRequest::new(self.bundle().await?)
            .with_name(self.name.clone().unwrap_or_default())
            .with_expires_in(self.expires_in.unwrap_or(config.default_expires_in))
            .with_view_limit(self.views.unwrap_or(config.default_view_limit))
            .with_access_type(self.access_type());
        let codec = ctx.codec()?;

        let link = if self.dry_run {
            share_with(MemorySecretStore::new(), codec, &request).await?
        } else {
            let client = ctx.client()?;
            let store = if self.public {
                HttpSecretStore::public(client)
            } else {
                HttpSecretStore::new(client)
            };
            share_with(store, codec, &request).await?
        };

        tracing::info!(
            id = %link.id,
            expires_at = %describe_expiry(link.expires_at),
            "shared secret"
        );
        Ok(ShareOutput {
            link,
            dry_run: self.dry_run,
        })
    }
}

fn describe_expiry(expires_at: OffsetDateTime) -> String {
    expires_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| expires_at.to_string())
}
