//! Provisioning configuration.
//!
//! Loaded once at process start and shared read-only afterwards.

use crate::error::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_BACKEND_URL: &str = "MOULD_BACKEND_URL";
const ENV_SERVICE_KEY: &str = "MOULD_SERVICE_KEY";
const ENV_DEFAULT_PASSWORD: &str = "MOULD_DEFAULT_PASSWORD";
const ENV_COMPANY_ID: &str = "MOULD_COMPANY_ID";
const ENV_OPERATOR_LEVEL: &str = "MOULD_OPERATOR_LEVEL";
const ENV_REQUEST_TIMEOUT_SECS: &str = "MOULD_REQUEST_TIMEOUT_SECS";

/// Configuration for the provisioning client.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Base URL of the hosted backend (e.g., "https://project.supabase.co").
    pub backend_url: String,

    /// Service-role key sent as both bearer token and `apikey` header.
    pub service_key: String,

    /// Password given to every new operator identity.
    pub default_password: String,

    /// Company (`empresa`) that new operators belong to.
    pub company_id: i64,

    /// Authorization level written to the profile row.
    pub operator_level: i64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            service_key: String::new(),
            default_password: "indus1234".to_string(),
            company_id: 5,
            operator_level: 2,
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ProvisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionConfig")
            .field("backend_url", &self.backend_url)
            .field("service_key", &"[REDACTED]")
            .field("default_password", &"[REDACTED]")
            .field("company_id", &self.company_id)
            .field("operator_level", &self.operator_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ProvisionConfig {
    /// Builds a config from `MOULD_*` environment variables over the defaults.
    pub fn from_env() -> ProvisionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup over the defaults.
    pub fn from_lookup<F>(lookup: F) -> ProvisionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BACKEND_URL) {
            config.backend_url = url;
        }
        if let Some(key) = lookup(ENV_SERVICE_KEY) {
            config.service_key = key;
        }
        if let Some(password) = lookup(ENV_DEFAULT_PASSWORD) {
            config.default_password = password;
        }
        if let Some(raw) = lookup(ENV_COMPANY_ID) {
            config.company_id = parse_number(ENV_COMPANY_ID, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OPERATOR_LEVEL) {
            config.operator_level = parse_number(ENV_OPERATOR_LEVEL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }

        Ok(config)
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Rejects configurations that cannot reach or authenticate to the backend.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.backend_url.trim().is_empty() {
            return Err(ProvisionError::Config("backend_url is empty".to_string()));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(ProvisionError::Config(format!(
                "backend_url must be an http(s) URL, got {}",
                self.backend_url
            )));
        }
        if self.service_key.trim().is_empty() {
            return Err(ProvisionError::Config("service_key is empty".to_string()));
        }
        if self.default_password.is_empty() {
            return Err(ProvisionError::Config(
                "default_password is empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ProvisionError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T>(key: &str, raw: &str) -> ProvisionResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ProvisionError::Config(format!("{key}={raw:?} is not a number: {e}")))
}
