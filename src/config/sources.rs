use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "RELIEFWEB_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/reliefweb.toml";
const ENV_PREFIX: &str = "RELIEFWEB";
const ENV_SEPARATOR: &str = "__";

const API_KEY_ENV_VAR: &str = "RELIEFWEB_POST_API_KEY";
const PROVIDER_ENV_VAR: &str = "RELIEFWEB_POST_API_PROVIDER";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config);

    Ok(config)
}

/// Load POST API credentials from environment variables.
/// The API key is never read from TOML files.
fn load_secrets(config: &mut Config) {
    if let Ok(api_key) = env::var(API_KEY_ENV_VAR) {
        config.post_api.api_key = Some(api_key);
    }

    if config.post_api.provider_id.is_none() {
        if let Ok(provider) = env::var(PROVIDER_ENV_VAR) {
            config.post_api.provider_id = Some(provider);
        }
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // RELIEFWEB__CACHE__LIFETIME -> cache.lifetime
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
