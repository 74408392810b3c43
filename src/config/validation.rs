use super::models::Config;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing or invalid ReliefWeb API URL: '{url}'")]
    InvalidApiUrl { url: String },

    #[error("Invalid URL for {field}: '{url}'")]
    InvalidUrl { field: &'static str, url: String },

    #[error("Cache lifetime must be positive when caching is enabled")]
    ZeroCacheLifetime,

    #[error("Cache namespace must not be empty")]
    EmptyCacheNamespace,

    #[error("Request timeout must be positive")]
    ZeroTimeout,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api(config)?;
    validate_cache(config)?;
    validate_post_api(config)?;
    validate_server(config)?;
    Ok(())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

fn validate_api(config: &Config) -> Result<(), ValidationError> {
    if !is_http_url(&config.api.url) {
        return Err(ValidationError::InvalidApiUrl {
            url: config.api.url.clone(),
        });
    }

    if config.api.timeout.as_duration().is_zero() {
        return Err(ValidationError::ZeroTimeout);
    }

    Ok(())
}

fn validate_cache(config: &Config) -> Result<(), ValidationError> {
    if config.cache.namespace.trim().is_empty() {
        return Err(ValidationError::EmptyCacheNamespace);
    }

    if config.cache.enabled && config.cache.lifetime.as_duration().is_zero() {
        return Err(ValidationError::ZeroCacheLifetime);
    }

    Ok(())
}

/// Optional URLs are only checked when present
fn validate_post_api(config: &Config) -> Result<(), ValidationError> {
    let urls = [
        ("post_api.schema_url", &config.post_api.schema_url),
        ("post_api.submission_base_url", &config.post_api.submission_base_url),
    ];

    for (field, value) in urls {
        if let Some(url) = value {
            if !is_http_url(url) {
                return Err(ValidationError::InvalidUrl {
                    field,
                    url: url.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if !is_http_url(&config.server.public_url) {
        return Err(ValidationError::InvalidUrl {
            field: "server.public_url",
            url: config.server.public_url.clone(),
        });
    }
    Ok(())
}
