use std::{fs, path::PathBuf};

use common::link::KeyPlacement;
use common::policy::{ExpiresIn, ViewLimit};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "veil";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOG_FILE_NAME: &str = "veil.log";

const DEFAULT_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the secret-sharing API
    #[serde(default = "default_url")]
    pub api_url: Url,
    /// Origin that share links are built under
    #[serde(default = "default_url")]
    pub link_origin: Url,
    /// Bearer token for organization shares; public shares need none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Put the key in the query (default) or in the fragment
    #[serde(default)]
    pub key_placement: KeyPlacement,
    #[serde(default)]
    pub default_expires_in: ExpiresIn,
    #[serde(default)]
    pub default_view_limit: ViewLimit,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Default log filter, a level or directives like `veil=debug`; RUST_LOG wins
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write daily-rolling logs here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_url() -> Url {
    Url::parse(DEFAULT_URL).expect("hardcoded URL must parse")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_url(),
            link_origin: default_url(),
            api_token: None,
            key_placement: KeyPlacement::default(),
            default_expires_in: ExpiresIn::default(),
            default_view_limit: ViewLimit::default(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the veil directory (~/.veil)
    pub veil_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the veil directory path (custom or default ~/.veil)
    pub fn veil_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new veil state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let veil_dir = Self::veil_dir(custom_path)?;
        let config_path = veil_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&veil_dir)?;

        let state = Self {
            veil_dir,
            config_path,
            config: config.unwrap_or_default(),
        };
        state.save()?;

        Ok(state)
    }

    /// Load existing state from the veil directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let veil_dir = Self::veil_dir(custom_path)?;
        let config_path = veil_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            veil_dir,
            config_path,
            config,
        })
    }

    /// Load state, falling back to defaults when nothing was initialized
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) => {
                let veil_dir = Self::veil_dir(custom_path)?;
                Ok(Self {
                    config_path: veil_dir.join(CONFIG_FILE_NAME),
                    veil_dir,
                    config: AppConfig::default(),
                })
            }
            other => other,
        }
    }

    /// Write the current config back to disk
    pub fn save(&self) -> Result<(), StateError> {
        let config_toml = toml::to_string_pretty(&self.config)?;

        // the file may hold an api token, so it is never readable by others
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.config_path)?;
            // mode only applies on create
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
            file.write_all(config_toml.as_bytes())?;
        }
        #[cfg(not(unix))]
        fs::write(&self.config_path, config_toml)?;

        Ok(())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.config.log_dir.as_ref().map(|dir| {
            if dir.is_relative() {
                self.veil_dir.join(dir)
            } else {
                dir.clone()
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("veil directory not initialized. Run 'veil init' first")]
    NotInitialized,

    #[error("veil directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
