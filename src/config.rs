use std::time::Duration;

use thiserror::Error;

use crate::access::{OriginAllowlist, RouteClassifier};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub access: AccessConfig,
    pub identity: IdentityConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub classifier: RouteClassifier,
    pub origins: OriginAllowlist,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Endpoint that resolves a bearer token to its subject
    pub verify_url: String,
    pub timeout_seconds: u64,
}

/// Client-side session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frontend_api: Option<String>,
    pub publishable_key: Option<String>,
    /// Upper bound on a single credential fetch
    pub token_timeout: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            classifier: RouteClassifier::default(),
            origins: OriginAllowlist::build(|_| None),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frontend_api: None,
            publishable_key: None,
            token_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let data_dir = lookup("DATA_DIR").unwrap_or_else(|| "./data".to_string());

        let classifier = match lookup("PUBLIC_PATHS") {
            Some(paths) => RouteClassifier::new(paths.split(',')),
            None => RouteClassifier::default(),
        };

        let origins = OriginAllowlist::build(&lookup);

        let verify_url = lookup("IDENTITY_VERIFY_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let timeout_seconds = lookup("IDENTITY_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let config = Config {
            access: AccessConfig {
                classifier,
                origins,
            },
            identity: IdentityConfig {
                verify_url,
                timeout_seconds,
            },
            server: ServerConfig {
                bind_address,
                data_dir,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.verify_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "IDENTITY_VERIFY_URL is required".to_string(),
            ));
        }

        if url::Url::parse(&self.identity.verify_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "IDENTITY_VERIFY_URL is not a valid URL: {}",
                self.identity.verify_url
            )));
        }

        if self.identity.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "IDENTITY_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.access.classifier.public_paths().is_empty() {
            tracing::warn!("No public paths configured. Every route requires authentication.");
        }

        Ok(())
    }
}

impl SessionConfig {
    /// Load session settings from environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let publishable_key =
            non_blank("CLERK_PUBLISHABLE_KEY").or_else(|| non_blank("VITE_CLERK_PUBLISHABLE_KEY"));
        let frontend_api = non_blank("CLERK_FRONTEND_API");
        let token_timeout = non_blank("SESSION_TOKEN_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Self {
            frontend_api,
            publishable_key,
            token_timeout,
        }
    }
}
