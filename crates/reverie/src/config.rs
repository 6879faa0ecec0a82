//! Layered configuration for the Reverie engine.
//!
//! Values are merged from, in increasing precedence:
//! - bundled defaults (`reverie.toml`, compiled in),
//! - `~/.config/reverie/reverie.toml`,
//! - `./reverie.toml`,
//! - `REVERIE_<SECTION>__<KEY>` environment variables.

use config::{Config, Environment, File, FileFormat};
use reverie_core::GenerationParams;
use reverie_error::{ConfigError, ReverieError, ReverieResult};
use reverie_playback::PlaybackConfig;
use reverie_queue::QueueConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../reverie.toml");

/// Complete engine configuration.
///
/// # Example
///
/// ```toml
/// [queue]
/// max_retries = 5
///
/// [playback]
/// continue_story = true
/// duration_override_ms = 4000
///
/// [generation]
/// width = 1024
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverieConfig {
    /// Image queue retry policy
    #[serde(default)]
    pub queue: QueueConfig,
    /// Autoplay behavior
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Parameters sent with every image prompt
    #[serde(default)]
    pub generation: GenerationParams,
}

impl ReverieConfig {
    /// Load the configuration from all layers.
    ///
    /// ```no_run
    /// use reverie::ReverieConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ReverieConfig::load()?;
    /// println!("{} retries", config.queue.max_retries());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> ReverieResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("reverie").join("reverie.toml");
            builder = builder.add_source(File::from(user_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("reverie").required(false))
            .add_source(
                Environment::with_prefix("REVERIE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        deserialize(builder.build())
    }

    /// Load the bundled defaults overridden by a single file.
    #[instrument(skip(path))]
    pub fn from_file(path: impl AsRef<Path>) -> ReverieResult<Self> {
        debug!(path = %path.as_ref().display(), "Loading configuration file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()).required(true));
        deserialize(builder.build())
    }

    /// Parse a configuration from TOML text on top of the bundled defaults.
    pub fn from_toml(text: &str) -> ReverieResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(text, FileFormat::Toml));
        deserialize(builder.build())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> ReverieResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ReverieError::from(ConfigError::new(format!(
                "Failed to serialize configuration: {}",
                e
            )))
        })
    }
}

fn deserialize(built: Result<Config, config::ConfigError>) -> ReverieResult<ReverieConfig> {
    built
        .map_err(|e| {
            ReverieError::from(ConfigError::new(format!(
                "Failed to build configuration: {}",
                e
            )))
        })?
        .try_deserialize()
        .map_err(|e| {
            ReverieError::from(ConfigError::new(format!(
                "Failed to parse configuration: {}",
                e
            )))
        })
}
