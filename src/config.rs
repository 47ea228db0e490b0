//! Environment configuration.
//!
//! Centralizes every environment toggle named in the governance contract
//! (§6) behind a single loader, the way `store.py::_get_store_root` and
//! `delete_policy.py::get_delete_policy` centralize theirs rather than
//! scattering `std::env::var` calls through the codebase.

use std::env;
use std::path::PathBuf;

/// Delete mode when a caller does not specify one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Soft,
    Hard,
}

impl DeleteMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "soft" => Some(Self::Soft),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Process-wide configuration resolved once at startup and handed to store
/// constructors; never a global singleton (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the run-artifact store (date-partitioned layout).
    pub store_root: PathBuf,
    /// Root directory for content-addressed attachment blobs. Distinct from
    /// `store_root` per §6.
    pub attachment_root: PathBuf,
    /// HMAC secret for signed attachment URLs. `None` disables minting and
    /// verification.
    pub signed_url_secret: Option<String>,
    /// Default delete mode when a caller omits `mode`.
    pub delete_default_mode: DeleteMode,
    /// Whether hard deletes are permitted at all.
    pub delete_allow_hard: bool,
    /// Header name carrying the admin assertion for hard deletes.
    pub delete_admin_header_name: String,
    /// Max deletes per actor per rate-limit window.
    pub delete_rate_limit_max: u32,
    /// Rate-limit window, in seconds.
    pub delete_rate_limit_window_sec: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("data/runs"),
            attachment_root: PathBuf::from("data/attachments"),
            signed_url_secret: None,
            delete_default_mode: DeleteMode::Soft,
            delete_allow_hard: false,
            delete_admin_header_name: "X-Admin".to_string(),
            delete_rate_limit_max: 10,
            delete_rate_limit_window_sec: 60,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, falling back to the
    /// documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_root: env::var("STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_root),
            attachment_root: env::var("ATTACHMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.attachment_root),
            signed_url_secret: env::var("SIGNED_URL_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            delete_default_mode: env::var("DELETE_DEFAULT_MODE")
                .ok()
                .and_then(|v| DeleteMode::parse(&v))
                .unwrap_or(defaults.delete_default_mode),
            delete_allow_hard: env::var("DELETE_ALLOW_HARD")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y"))
                .unwrap_or(defaults.delete_allow_hard),
            delete_admin_header_name: env::var("DELETE_ADMIN_HEADER_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.delete_admin_header_name),
            delete_rate_limit_max: env::var("DELETE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.delete_rate_limit_max),
            delete_rate_limit_window_sec: env::var("DELETE_RATE_LIMIT_WINDOW_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.delete_rate_limit_window_sec),
        }
    }
}
