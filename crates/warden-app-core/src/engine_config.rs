// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Loading and persisting [`EngineConfig`] through a [`ConfigStore`].

use tracing::{info, warn};
use warden_core::EngineConfig;

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Store key under which the engine configuration lives.
pub const ENGINE_CONFIG_KEY: &str = "engine";

/// Loads the engine configuration, defaulting when absent.
///
/// Missing fields take their defaults. A zero limit is rejected.
///
/// # Errors
/// [`ConfigError::Invalid`] for a zero limit; store and JSON errors as
/// reported by [`ConfigService::load`].
pub fn load_engine_config<S: ConfigStore>(
    service: &ConfigService<S>,
) -> Result<EngineConfig, ConfigError> {
    let config = match service.load::<EngineConfig>(ENGINE_CONFIG_KEY)? {
        Some(config) => config,
        None => {
            info!("no engine config stored; using defaults");
            EngineConfig::default()
        }
    };
    validate(&config)?;
    Ok(config)
}

/// Validates and persists the engine configuration.
///
/// # Errors
/// [`ConfigError::Invalid`] for a zero limit; store and JSON errors.
pub fn save_engine_config<S: ConfigStore>(
    service: &ConfigService<S>,
    config: &EngineConfig,
) -> Result<(), ConfigError> {
    validate(config)?;
    service.save(ENGINE_CONFIG_KEY, config)
}

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    if let Some(name) = config.zero_limit() {
        warn!(limit = name, "engine config rejected");
        return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
    }
    Ok(())
}
