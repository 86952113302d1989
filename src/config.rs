//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `STOREFRONT_*` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::images::{DEFAULT_FILE_HOST, MAX_IMAGE_BYTES};

/// Config file read when no `--config` is given (ignored if absent)
pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";

/// Prefix for environment overrides, e.g. `STOREFRONT_SESSION_SECRET`
pub const ENV_PREFIX: &str = "STOREFRONT_";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Commerce backend secret key (bearer credential)
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    /// Host that accepts file uploads
    pub stripe_files_base: String,
    /// The only origin the image proxy will fetch from
    pub trusted_file_host: String,
    /// Public base URL of this storefront
    pub public_url: String,
    /// HMAC secret for session tokens
    pub session_secret: String,
    /// Public key handed to the browser-side image editor
    pub editor_api_key: Option<String>,
    /// External demo auth endpoint used by `/login`
    pub auth_api_url: String,
    /// Path prefixes that require a verified session
    pub protected_paths: Vec<String>,
    pub session_duration_secs: u64,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            stripe_secret_key: String::new(),
            stripe_api_base: "https://api.stripe.com".to_string(),
            stripe_files_base: DEFAULT_FILE_HOST.to_string(),
            trusted_file_host: DEFAULT_FILE_HOST.to_string(),
            public_url: "http://localhost:3000".to_string(),
            session_secret: String::new(),
            editor_api_key: None,
            auth_api_url: "https://fakestoreapi.com/auth/login".to_string(),
            protected_paths: vec!["/orders".to_string()],
            session_duration_secs: 24 * 60 * 60,
            secure_cookies: false,
            max_upload_bytes: MAX_IMAGE_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        figment = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a config from an assembled figment
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "session_secret must be set".to_string(),
            ));
        }
        if url::Url::parse(&self.trusted_file_host).is_err() {
            return Err(ConfigError::Invalid(format!(
                "trusted_file_host is not a URL: {}",
                self.trusted_file_host
            )));
        }
        if self.session_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "session_duration_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
        assert_eq!(config.trusted_file_host, "https://files.stripe.com");
        assert_eq!(config.protected_paths, vec!["/orders".to_string()]);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_missing_secret_rejected() {
        let result = Config::from_figment(base_figment());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
session_secret = "s3cret"
public_url = "https://shop.example.com"
bind_addr = "0.0.0.0:8080"
protected_paths = ["/orders", "/account"]
"#
        )
        .unwrap();

        let config =
            Config::from_figment(base_figment().merge(Toml::file(file.path()))).unwrap();
        assert_eq!(config.session_secret, "s3cret");
        assert_eq!(config.public_url, "https://shop.example.com");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.protected_paths.len(), 2);
        // Untouched keys keep their defaults
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
    }

    #[test]
    fn test_explicit_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/storefront.toml")));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_bad_trusted_host() {
        let config = Config {
            session_secret: "x".to_string(),
            trusted_file_host: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
