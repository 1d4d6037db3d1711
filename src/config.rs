use crate::error::GenError;
use clap::ValueEnum;
use dirs::config_dir;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_DIR_NAME: &str = "gen";
pub const CONFIG_FILE_NAME: &str = "setting.json";

/// On-disk settings, `<config root>/gen/setting.json`.
///
/// Field names follow the established file layout; unknown keys are ignored
/// and missing ones come back as empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// "gemini" or "chatgpt". Anything else selects Gemini.
    #[serde(rename = "DefaultUseService", deserialize_with = "null_as_default")]
    pub default_provider: String,

    #[serde(rename = "Gemini", deserialize_with = "null_as_default")]
    pub gemini: ServiceConfig,

    #[serde(rename = "ChatGpt", deserialize_with = "null_as_default")]
    pub chatgpt: ServiceConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(rename = "ApiKey", deserialize_with = "null_as_default")]
    pub api_key: String,
}

/// `null` reads as the zero value, the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Gemini,
    #[value(name = "chatgpt")]
    ChatGpt,
}

impl Provider {
    /// Maps the `DefaultUseService` value onto a provider. Blank or unknown
    /// values fall back to Gemini.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "chatgpt" => Self::ChatGpt,
            _ => Self::Gemini,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::ChatGpt => "chatgpt",
        }
    }
}

impl Config {
    pub fn provider(&self) -> Provider {
        Provider::from_setting(&self.default_provider)
    }

    pub fn api_key_for(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini.api_key,
            Provider::ChatGpt => &self.chatgpt.api_key,
        }
    }
}

/// The per-user config directory (`$XDG_CONFIG_HOME` on Linux).
pub fn default_config_root() -> PathBuf {
    config_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn resolve_path(config_root: &Path) -> PathBuf {
    config_root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

pub fn load(path: &Path) -> Result<Config, GenError> {
    let content = fs::read_to_string(path).map_err(|source| GenError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: Config = serde_json::from_str(&content).map_err(|source| GenError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), provider = cfg.provider().as_str(), "loaded config");
    Ok(cfg)
}

/// Writes a blank config to `path`, creating parent directories.
///
/// Returns `false` without touching anything when a file is already there.
pub fn write_template(path: &Path) -> Result<bool, GenError> {
    let write_err = |source| GenError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        return Ok(false);
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let mut content = serde_json::to_string_pretty(&Config::default())
        .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    content.push('\n');

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(write_err(err)),
    };
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;

    debug!(path = %path.display(), "wrote config template");
    Ok(true)
}
