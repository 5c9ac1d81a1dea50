use crate::profile::find_profile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unknown profile in config: '{0}'")]
    UnknownProfile(String),
    #[error("event_pump.wait_timeout_ms must not be 0 (use -1 to block or a positive bound)")]
    ZeroWaitTimeout,
    #[error("HOME not set")]
    HomeNotSet,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LumenConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub shaders: ShaderSection,
    #[serde(default)]
    pub profile: ProfileSection,
    #[serde(default)]
    pub event_pump: EventPumpSection,
    #[serde(default)]
    pub fatal: FatalSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineSettings {
    pub backend: String,
    pub vo: String,
    pub gpu_api: String,
    pub gpu_context: String,
    pub hwdec: String,
    /// Level at which engine log messages are requested.
    pub log_level: String,
    pub msg_level: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: "libmpv".to_owned(),
            vo: "gpu".to_owned(),
            gpu_api: "auto".to_owned(),
            gpu_context: "auto".to_owned(),
            hwdec: "auto-safe".to_owned(),
            log_level: "terminal-default".to_owned(),
            msg_level: "all=v".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShaderSection {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileSection {
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EventPumpSection {
    /// Negative values block until an event arrives or the engine is woken.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: i64,
}

impl Default for EventPumpSection {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

impl EventPumpSection {
    pub fn wait_timeout(&self) -> Option<Duration> {
        u64::try_from(self.wait_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }
}

fn default_wait_timeout_ms() -> i64 {
    -1
}

/// What the host does when an operation fails fatally.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// Log the diagnostic and exit the process.
    #[default]
    Terminate,
    /// Hand the error back to the caller.
    Return,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FatalSection {
    #[serde(default)]
    pub policy: FatalPolicy,
}

impl LumenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.profile.default {
            if find_profile(name).is_none() {
                return Err(ConfigError::UnknownProfile(name.clone()));
            }
        }
        // A zero wait turns the event thread into a busy poll.
        if self.event_pump.wait_timeout_ms == 0 {
            return Err(ConfigError::ZeroWaitTimeout);
        }
        Ok(())
    }

    pub fn shader_dir(&self) -> Option<&Path> {
        self.shaders.dir.as_deref()
    }

    /// Load `~/.config/lumen/config.toml`, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        if path.exists() {
            parse_config_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}

pub fn parse_config_str(input: &str) -> Result<LumenConfig, ConfigError> {
    let config: LumenConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<LumenConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::HomeNotSet)?;
    Ok(PathBuf::from(home).join(".config/lumen/config.toml"))
}
