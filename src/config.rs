use crate::error::ConfigError;
use crate::obs::{Endpoint, DEFAULT_PORT};
use clap::Args;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Values read from the settings file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub stream_address: Option<String>,
    pub control_host: Option<String>,
    pub control_port: Option<u16>,
    pub control_credential: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Command-line flags, each falling back to its environment variable.
#[derive(Debug, Default, Clone, Args)]
pub struct Overrides {
    /// IP Webcam address, e.g. 192.168.1.100:8080
    #[arg(value_name = "STREAM_ADDRESS", env = "ANDROID_IP")]
    pub stream_address: Option<String>,

    /// OBS WebSocket host [default: localhost]
    #[arg(long, visible_alias = "obs-host", env = "OBS_HOST")]
    pub control_host: Option<String>,

    /// OBS WebSocket port [default: 4455]
    #[arg(long, visible_alias = "obs-port", env = "OBS_PORT")]
    pub control_port: Option<u16>,

    /// OBS WebSocket password, if authentication is enabled
    #[arg(long, visible_alias = "obs-password", env = "OBS_PASSWORD", hide_env_values = true)]
    pub control_credential: Option<String>,

    /// Output width [default: 1920]
    #[arg(long, env = "VIDEO_WIDTH")]
    pub width: Option<u32>,

    /// Output height [default: 1080]
    #[arg(long, env = "VIDEO_HEIGHT")]
    pub height: Option<u32>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub stream_address: String,
    pub control_host: String,
    pub control_port: u16,
    pub credential: String,
    pub output_width: u32,
    pub output_height: u32,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    /// Merge the layers: defaults < settings file < environment/command line.
    pub fn resolve(file: FileSettings, overrides: Overrides) -> Result<Self, ConfigError> {
        let stream_address = non_blank(overrides.stream_address)
            .or_else(|| non_blank(file.stream_address))
            .ok_or(ConfigError::MissingStreamAddress)?;

        Ok(Self {
            stream_address,
            control_host: non_blank(overrides.control_host)
                .or_else(|| non_blank(file.control_host))
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            control_port: overrides
                .control_port
                .or(file.control_port)
                .unwrap_or(DEFAULT_PORT),
            credential: overrides
                .control_credential
                .or(file.control_credential)
                .unwrap_or_default(),
            output_width: overrides.width.or(file.width).unwrap_or(DEFAULT_WIDTH),
            output_height: overrides.height.or(file.height).unwrap_or(DEFAULT_HEIGHT),
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.control_host, self.control_port, &self.credential)
    }
}

/// Returns the path to the settings file: ~/.config/{app_name}/config.toml
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(crate::app_constants::APP_NAME_LOWER).join("config.toml"))
}

/// Load the settings layer.
///
/// An explicit path must exist. The default path is optional; if it is
/// missing (or no config directory exists) the layer is empty.
pub fn load_settings(explicit: Option<&Path>) -> Result<FileSettings, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    match config_path() {
        Some(path) if path.exists() => load_from_path(&path),
        Some(path) => {
            debug!("No settings file at {}", path.display());
            Ok(FileSettings::default())
        }
        None => Ok(FileSettings::default()),
    }
}

/// Load settings from a specific path
fn load_from_path(path: &Path) -> Result<FileSettings, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}
