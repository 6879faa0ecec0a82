//! Tracing subscriber setup.

use reverie_error::{ConfigError, ReverieError, ReverieResult};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` when
/// `verbose` is set and `info` if not. With `json` every event is written
/// as one JSON object per line.
pub fn init_tracing(verbose: bool, json: bool) -> ReverieResult<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| {
            ReverieError::from(ConfigError::new(format!("Invalid log filter: {}", e)))
        })?;

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| {
            ReverieError::from(ConfigError::new(format!(
                "Failed to install tracing subscriber: {}",
                e
            )))
        })
}
