pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(about = "Share secrets through links the server cannot read", version)]
pub struct Args {
    /// Secret-sharing API to talk to (defaults to `api_url` from the config)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the veil config directory (defaults to ~/.veil)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log filter, a level or directives like `veil=debug`; RUST_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
