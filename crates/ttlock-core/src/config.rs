//! Client configuration.
//!
//! A [`ClientConfig`] carries the application identity issued by the TTLock
//! open platform, the account the client acts as, which regional API host to
//! talk to, and the renewal policy for the background token refresh.
//!
//! The type is serde-friendly so callers can load it however they like;
//! [`ClientConfig::from_env`] covers the common environment-variable case.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::RenewalPolicy;

/// API host for accounts registered in mainland China
pub const CN_BASE_URL: &str = "https://cnapi.ttlock.com";

/// API host for accounts registered in Europe
pub const EU_BASE_URL: &str = "https://euapi.ttlock.com";

/// HTTP request timeout in seconds. Applies to token calls as well, so a hung
/// connection cannot stall renewal.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const ENV_CLIENT_ID: &str = "TTLOCK_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "TTLOCK_CLIENT_SECRET";
const ENV_USERNAME: &str = "TTLOCK_USERNAME";
const ENV_PASSWORD: &str = "TTLOCK_PASSWORD";
const ENV_BASE_URL: &str = "TTLOCK_BASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    China,
    Europe,
}

impl Region {
    pub fn base_url(self) -> &'static str {
        match self {
            Region::China => CN_BASE_URL,
            Region::Europe => EU_BASE_URL,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    /// Plain text; MD5-hashed when the token request is built.
    pub password: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub renewal: RenewalPolicy,
}

fn default_base_url() -> String {
    CN_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
            base_url: default_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            renewal: RenewalPolicy::default(),
        }
    }

    /// Build a config from `TTLOCK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            required_var(ENV_CLIENT_ID)?,
            required_var(ENV_CLIENT_SECRET)?,
            required_var(ENV_USERNAME)?,
            required_var(ENV_PASSWORD)?,
        );
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.base_url = region.base_url().to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_renewal(mut self, renewal: RenewalPolicy) -> Self {
        self.renewal = renewal;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Reject configs that cannot possibly authenticate.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("username", &self.username),
            ("password", &self.password),
            ("base_url", &self.base_url),
        ];
        for (name, value) in required {
            anyhow::ensure!(!value.trim().is_empty(), "Config field `{}` must not be empty", name);
        }
        anyhow::ensure!(self.request_timeout_secs > 0, "Config field `request_timeout_secs` must be positive");
        Ok(())
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing environment variable {}", name))
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("renewal", &self.renewal)
            .finish()
    }
}
