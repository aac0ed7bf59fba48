use crate::json::JsonConfig;
use crate::random::RandomStringOptions;
use crate::upload::UploadConfig;
use byte_unit::Byte;
use config::{self, ConfigError};
use std::path::Path;
use std::time::Duration;

/// Configuration values.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration settings.
    pub settings: Option<Settings>,
    /// Server configuration.
    pub server: ServerConfig,
    /// Upload configuration.
    pub upload: UploadConfig,
    /// JSON body configuration.
    pub json: JsonConfig,
    /// Default random string options.
    pub random: RandomStringOptions,
}

/// General settings for configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    /// Refresh rate of the configuration file.
    #[serde(with = "humantime_serde")]
    pub refresh_rate: Duration,
}

/// Server configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The socket address to bind.
    pub address: String,
    /// Number of workers to start.
    pub workers: Option<usize>,
    /// Maximum content length of a whole request.
    pub max_content_length: Byte,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:8000"),
            workers: None,
            max_content_length: Byte::from_u64(1024 * 1024 * 1024),
        }
    }
}

impl Config {
    /// Parses the config file and returns the values.
    ///
    /// Environment variables override the file, e.g. `SERVER__ADDRESS`.
    pub fn parse(path: &Path) -> Result<Config, ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}
