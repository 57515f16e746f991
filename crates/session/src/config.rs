//! Reconciler configuration loaded from environment variables.
//!
//! Every variable is optional; defaults match the storefront's routes.
//!
//! # Environment Variables
//!
//! - `SECONDHAND_HOME_PATH` - Home view (default: `/`)
//! - `SECONDHAND_LANDING_PATH` - Post-login landing view (default: `/moje-konto`)
//! - `SECONDHAND_LOGIN_VIEW` - Login form view (default: `/logowanie`)
//! - `SECONDHAND_REGISTER_VIEW` - Registration form view (default: `/rejestracja`)
//! - `SECONDHAND_LOGIN_ENDPOINT` - Login submission endpoint (default: `/api/auth/login`)
//! - `SECONDHAND_REGISTER_ENDPOINT` - Registration endpoint (default: `/api/auth/register`)
//! - `SECONDHAND_MAIN_TARGET` - Main content swap target id (default: `content`)
//! - `SECONDHAND_FORM_ERROR_CONTAINERS` - Comma-separated inline error container ids
//!   (default: `login-form-errors,registration-form-errors`)
//! - `SECONDHAND_NOTIFICATION_MIN_DISPLAY_MS` - Minimum time a notification stays
//!   visible before a gated navigation (default: 700)
//! - `SECONDHAND_SCROLL_SETTLE_MS` - Layout settle time before scroll restoration
//!   (default: 100)
//! - `SECONDHAND_BFCACHE_GRACE_MS` - Grace period before force-hiding the loading
//!   indicator after a back/forward cache restore (default: 150)

use std::time::Duration;

use secondhand_core::Routes;
use thiserror::Error;

const DEFAULT_NOTIFICATION_MIN_DISPLAY_MS: u64 = 700;
const DEFAULT_SCROLL_SETTLE_MS: u64 = 100;
const DEFAULT_BFCACHE_GRACE_MS: u64 = 150;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Session reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Route table
    pub routes: Routes,
    /// Id of the main content region swaps target
    pub main_target: String,
    /// Inline form-error containers cleared after unrelated swaps
    pub form_error_containers: Vec<String>,
    /// Minimum display time of a notification that gates a navigation
    pub notification_min_display: Duration,
    /// Delay before restoring a remembered scroll offset
    pub scroll_settle_delay: Duration,
    /// Delay before force-hiding the indicator after a bfcache restore
    pub bfcache_grace: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            routes: Routes::default(),
            main_target: "content".to_string(),
            form_error_containers: vec![
                "login-form-errors".to_string(),
                "registration-form-errors".to_string(),
            ],
            notification_min_display: Duration::from_millis(DEFAULT_NOTIFICATION_MIN_DISPLAY_MS),
            scroll_settle_delay: Duration::from_millis(DEFAULT_SCROLL_SETTLE_MS),
            bfcache_grace: Duration::from_millis(DEFAULT_BFCACHE_GRACE_MS),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a path does not start with `/` or a duration
    /// is not a whole number of milliseconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let routes = Routes {
            home: get_path("SECONDHAND_HOME_PATH", &defaults.routes.home)?,
            landing: get_path("SECONDHAND_LANDING_PATH", &defaults.routes.landing)?,
            login_view: get_path("SECONDHAND_LOGIN_VIEW", &defaults.routes.login_view)?,
            register_view: get_path("SECONDHAND_REGISTER_VIEW", &defaults.routes.register_view)?,
            login_endpoint: get_path("SECONDHAND_LOGIN_ENDPOINT", &defaults.routes.login_endpoint)?,
            register_endpoint: get_path(
                "SECONDHAND_REGISTER_ENDPOINT",
                &defaults.routes.register_endpoint,
            )?,
        };

        let form_error_containers = get_optional_env("SECONDHAND_FORM_ERROR_CONTAINERS")
            .map_or(defaults.form_error_containers, |raw| parse_list(&raw));

        Ok(Self {
            routes,
            main_target: get_env_or_default("SECONDHAND_MAIN_TARGET", &defaults.main_target),
            form_error_containers,
            notification_min_display: get_millis(
                "SECONDHAND_NOTIFICATION_MIN_DISPLAY_MS",
                DEFAULT_NOTIFICATION_MIN_DISPLAY_MS,
            )?,
            scroll_settle_delay: get_millis("SECONDHAND_SCROLL_SETTLE_MS", DEFAULT_SCROLL_SETTLE_MS)?,
            bfcache_grace: get_millis("SECONDHAND_BFCACHE_GRACE_MS", DEFAULT_BFCACHE_GRACE_MS)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a route path, which must be absolute.
fn get_path(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    validate_path(&value).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))?;
    Ok(value)
}

/// Get a duration expressed in whole milliseconds.
fn get_millis(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(Duration::from_millis(default)),
    }
}

fn validate_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("path must start with '/' (got '{path}')"));
    }
    if path.contains(['?', '#']) {
        return Err(format!("path must not carry a query or fragment (got '{path}')"));
    }
    Ok(())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
