// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "ironlog";
const CONFIG_ENV_VAR: &str = "IRONLOG_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("No signed-in user configured. Set [sync] user_id in {0:?} to enable sync.")]
    UserNotSet(PathBuf),
    #[error("No sync server configured. Set [sync] server_url in {0:?}.")]
    ServerNotSet(PathBuf),
}

/// Settings for the hosted row store used by the sync engine.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the hosted backend, e.g. "https://api.example.com".
    pub server_url: Option<String>,
    /// Identity of the signed-in user; remote rows are partitioned by this.
    pub user_id: Option<String>,
    /// Bearer token sent with every remote request.
    pub auth_token: Option<String>,
}

/// Settings for the optional third-party fitness service.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: Option<String>,
    pub authorize_url: String,
    pub api_url: String,
    /// Serverless proxy performing the secret-bearing token exchange.
    pub proxy_url: Option<String>,
    pub redirect_uri: String,
    pub scopes: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            authorize_url: "https://www.strava.com/oauth/authorize".to_string(),
            api_url: "https://www.strava.com/api/v3".to_string(),
            proxy_url: None,
            redirect_uri: "http://localhost:8723/callback".to_string(),
            scopes: "activity:read_all".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    pub sync: SyncConfig,
    pub provider: ProviderConfig,
}

/// Determines the path to the configuration file.
pub fn get_config_path() -> Result<PathBuf, Error> {
    let config_dir_path = if let Ok(path_str) = std::env::var(CONFIG_ENV_VAR) {
        PathBuf::from(path_str)
    } else {
        let base_config_dir = dirs::config_dir().ok_or(Error::CannotDetermineConfigDir)?;
        base_config_dir.join(APP_CONFIG_DIR)
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, writing a default file on first run.
pub fn load(config_path: &Path) -> Result<Config, Error> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content).map_err(Error::TomlParse)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
pub fn save(config_path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config).map_err(Error::TomlSerialize)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
