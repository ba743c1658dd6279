//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `STOREFRONT_*` environment variables and configuration
//! files; unset values fall back to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

/// API root used when none is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_DEBOUNCE_MS: u64 = 200;
const DEFAULT_REDIRECT_DELAY_MS: u64 = 1_000;
const DEFAULT_SESSION_POLL_MS: u64 = 1_000;

/// Settings shared by the library facade and the CLI.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STOREFRONT")]
pub struct ClientSettings {
    /// API root every request path is appended to.
    pub api_base: Option<String>,
    /// Default request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Delay before a collection fetch hits the network, in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Delay between a `401` and the login redirect, in milliseconds.
    pub redirect_delay_ms: Option<u64>,
    /// Session file; the session lives in memory when unset.
    pub session_file: Option<PathBuf>,
    /// How often the session file is re-read for changes made by other
    /// processes, in milliseconds.
    pub session_poll_ms: Option<u64>,
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid api_base {value:?}: {message}")]
pub struct InvalidApiBase {
    /// Configured value.
    pub value: String,
    /// Parser message.
    pub message: String,
}

impl ClientSettings {
    /// Parsed API root, falling back to [`DEFAULT_API_BASE`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidApiBase`] when the configured value is not an
    /// absolute URL.
    pub fn api_base(&self) -> Result<Url, InvalidApiBase> {
        let raw = self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        Url::parse(raw).map_err(|error| InvalidApiBase {
            value: raw.to_owned(),
            message: error.to_string(),
        })
    }

    /// Default request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    /// Collection fetch debounce.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    /// Delay before redirecting to login after a `401`.
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms.unwrap_or(DEFAULT_REDIRECT_DELAY_MS))
    }

    /// Interval between session file reloads.
    pub fn session_poll(&self) -> Duration {
        Duration::from_millis(self.session_poll_ms.unwrap_or(DEFAULT_SESSION_POLL_MS))
    }

    /// Configured session file, if any.
    pub fn session_file(&self) -> Option<&PathBuf> {
        self.session_file.as_ref()
    }
}
