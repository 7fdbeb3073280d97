// latex-proxy-client - util/constants.rs
//
// Single source of truth for all named constants, storage keys, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "latex-proxy";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "latex-proxy";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Backend API
// =============================================================================

/// Base URL used when neither the environment, the CLI, nor config.toml
/// supplies one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Environment variable that overrides the configured API base URL.
pub const API_BASE_URL_ENV: &str = "LATEX_PROXY_API_URL";

/// Error message used when a failed response carries neither a `msg` field
/// nor any body text.
pub const GENERIC_API_ERROR: &str = "API request failed";

/// First page of the request log listing.
pub const DEFAULT_LOG_PAGE: u32 = 1;

// =============================================================================
// Durable storage keys
// =============================================================================

/// Key holding the raw bearer token, read by the API client's session.
pub const TOKEN_KEY: &str = "token";

/// Key holding the persisted store subset
/// `{token, selectedProfileId, isSidebarOpen}`.
pub const STORE_KEY: &str = "latex-proxy-storage";

// =============================================================================
// Notifications
// =============================================================================

/// Toast display duration when the caller does not specify one.
pub const DEFAULT_TOAST_DURATION_MS: u64 = 3_000;

/// Length of the generated base-36 toast identifier.
pub const TOAST_ID_LEN: usize = 7;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG, --debug, nor config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// File names
// =============================================================================

/// Configuration file name (one level above the platform config dir).
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Durable key/value storage file name inside the platform data dir.
pub const STORAGE_FILE_NAME: &str = "storage.json";
