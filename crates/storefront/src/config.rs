//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `EASYKART_API_URL` - Catalog and identity service (default: <https://myeasykart.codeyogi.io>)
//! - `EASYKART_DATA_DIR` - Directory holding the persisted cart and token (default: `.easykart`)
//! - `EASYKART_CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `EASYKART_CATALOG_CACHE_CAPACITY` - Maximum cached catalog entries (default: 1000)
//! - `EASYKART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "https://myeasykart.codeyogi.io";
const DEFAULT_DATA_DIR: &str = ".easykart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote catalog/account service
    pub api_url: Url,
    /// Directory for the durable key-value store
    pub data_dir: PathBuf,
    /// Catalog cache settings
    pub catalog_cache: CatalogCacheConfig,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Product lookup cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CatalogCacheConfig {
    /// How long a fetched product stays fresh
    pub time_to_live: Duration,
    /// Maximum number of cached entries
    pub max_capacity: u64,
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(300),
            max_capacity: 1000,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("EASYKART_API_URL", DEFAULT_API_URL))?;
        let data_dir = PathBuf::from(get_env_or_default("EASYKART_DATA_DIR", DEFAULT_DATA_DIR));
        let catalog_cache = CatalogCacheConfig {
            time_to_live: Duration::from_secs(get_parsed_env(
                "EASYKART_CATALOG_CACHE_TTL_SECS",
                300,
            )?),
            max_capacity: get_parsed_env("EASYKART_CATALOG_CACHE_CAPACITY", 1000)?,
        };
        let http_timeout = Duration::from_secs(get_parsed_env("EASYKART_HTTP_TIMEOUT_SECS", 10)?);

        Ok(Self {
            api_url,
            data_dir,
            catalog_cache,
            http_timeout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at a given service and data directory, with
    /// defaults for everything else.
    #[must_use]
    pub fn with_endpoints(api_url: Url, data_dir: PathBuf) -> Self {
        Self {
            api_url,
            data_dir,
            catalog_cache: CatalogCacheConfig::default(),
            http_timeout: Duration::from_secs(10),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Resolve a path relative to the service base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the service URL, normalizing it to end with a slash so `join`
/// appends rather than replaces the last path segment.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar("EASYKART_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "EASYKART_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_appends_slash() {
        let url = parse_api_url("https://myeasykart.codeyogi.io").unwrap();
        assert_eq!(url.as_str(), "https://myeasykart.codeyogi.io/");

        let url = parse_api_url("http://localhost:8080/api").unwrap();
        assert_eq!(url.join("me").unwrap().as_str(), "http://localhost:8080/api/me");
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let result = parse_api_url("ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));

        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_endpoint_joins_product_path() {
        let config = StorefrontConfig::with_endpoints(
            parse_api_url("https://myeasykart.codeyogi.io").unwrap(),
            PathBuf::from("/tmp/easykart"),
        );
        assert_eq!(
            config.endpoint("product/7").unwrap().as_str(),
            "https://myeasykart.codeyogi.io/product/7"
        );
    }

    #[test]
    fn test_default_cache_config() {
        let cache = CatalogCacheConfig::default();
        assert_eq!(cache.time_to_live, Duration::from_secs(300));
        assert_eq!(cache.max_capacity, 1000);
    }
}
