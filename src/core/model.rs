// latex-proxy-client - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies.
//
// These types are the shared vocabulary across all layers: they are what the
// backend sends, what the stores hold, and what the API client sends back.
// JSON field names are camelCase to match the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// The authenticated account, as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub login: String,

    /// Key clients present to the proxy endpoint. Never logged.
    #[serde(default)]
    pub api_key: String,

    /// Profile the proxy uses for this user's requests.
    #[serde(default)]
    pub active_profile_id: Option<String>,

    /// User-defined display order of profile ids.
    #[serde(default)]
    pub profile_order: Option<Vec<String>>,

    /// Whether proxied requests are recorded in the request log.
    #[serde(default)]
    pub logging_enabled: bool,

    /// Provider inherited by profiles whose `provider_source` is `Global`.
    #[serde(default)]
    pub global_provider: Option<ProviderConfig>,

    #[serde(default)]
    pub content_filters: Option<Vec<ContentFilter>>,

    #[serde(default)]
    pub filter_groups: Option<Vec<FilterGroup>>,

    /// Opaque snapshot of the most recent proxied request.
    #[serde(default)]
    pub last_request: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

/// Upstream AI-service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub endpoint: String,
    /// Never logged.
    pub api_key: String,
    pub model: String,
}

/// A find/replace rule applied to prompt content by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// A named group of content filters that can be toggled together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

// =============================================================================
// Profile and Tab
// =============================================================================

/// Whether a profile uses its own provider or inherits the user's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSource {
    /// The profile's own `provider` settings.
    #[default]
    Profile,
    /// The user's `global_provider`.
    Global,
}

/// A named configuration bundle: ordered prompt tabs plus provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,

    pub user_id: String,

    pub name: String,

    /// Prompt fragments in send order. Order is significant.
    #[serde(default)]
    pub tabs: Vec<Tab>,

    #[serde(default)]
    pub active_tab_id: Option<String>,

    #[serde(default)]
    pub provider_source: ProviderSource,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub proxy_endpoint: Option<String>,

    /// Never logged.
    #[serde(default)]
    pub proxy_api_key: Option<String>,

    #[serde(default)]
    pub proxy_model: Option<String>,

    /// Collapse adjacent messages with the same role before forwarding.
    #[serde(default)]
    pub merge_consecutive_roles: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Tab with the given id, if present.
    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    /// The tab referenced by `active_tab_id`, if set and still present.
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id.as_deref().and_then(|id| self.tab(id))
    }

    /// Provider that applies to this profile, resolving inheritance.
    pub fn effective_provider<'a>(&'a self, user: Option<&'a User>) -> Option<&'a ProviderConfig> {
        match self.provider_source {
            ProviderSource::Profile => Some(&self.provider),
            ProviderSource::Global => user.and_then(|u| u.global_provider.as_ref()),
        }
    }
}

/// Message role of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabRole {
    #[default]
    System,
    User,
}

impl TabRole {
    pub fn label(&self) -> &'static str {
        match self {
            TabRole::System => "system",
            TabRole::User => "user",
        }
    }
}

impl std::fmt::Display for TabRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single prompt fragment within a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub role: TabRole,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

// =============================================================================
// Partial bodies and patches
// =============================================================================

/// Fields for a new profile. Absent fields take server defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_source: Option<ProviderSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_consecutive_roles: Option<bool>,
}

/// Partial update of a profile. Only present fields are sent and merged.
///
/// Outgoing only: `Some(None)` serialises as an explicit `null` to clear a
/// field, a distinction a derived deserializer would collapse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<Tab>>,
    /// `Some(None)` clears the active tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_source: Option<ProviderSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_endpoint: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_api_key: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_model: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_consecutive_roles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    /// Merge every present field into `profile`.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(ref name) = self.name {
            profile.name = name.clone();
        }
        if let Some(ref tabs) = self.tabs {
            profile.tabs = tabs.clone();
        }
        if let Some(ref active) = self.active_tab_id {
            profile.active_tab_id = active.clone();
        }
        if let Some(source) = self.provider_source {
            profile.provider_source = source;
        }
        if let Some(ref provider) = self.provider {
            profile.provider = provider.clone();
        }
        if let Some(ref endpoint) = self.proxy_endpoint {
            profile.proxy_endpoint = endpoint.clone();
        }
        if let Some(ref key) = self.proxy_api_key {
            profile.proxy_api_key = key.clone();
        }
        if let Some(ref model) = self.proxy_model {
            profile.proxy_model = model.clone();
        }
        if let Some(merge) = self.merge_consecutive_roles {
            profile.merge_consecutive_roles = merge;
        }
        if let Some(updated) = self.updated_at {
            profile.updated_at = updated;
        }
    }

    /// Patch that carries every mutable field of `profile`, used to apply a
    /// server response onto the local copy without touching its identity.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: Some(profile.name.clone()),
            tabs: Some(profile.tabs.clone()),
            active_tab_id: Some(profile.active_tab_id.clone()),
            provider_source: Some(profile.provider_source),
            provider: Some(profile.provider.clone()),
            proxy_endpoint: Some(profile.proxy_endpoint.clone()),
            proxy_api_key: Some(profile.proxy_api_key.clone()),
            proxy_model: Some(profile.proxy_model.clone()),
            merge_consecutive_roles: Some(profile.merge_consecutive_roles),
            updated_at: Some(profile.updated_at),
        }
    }
}

/// Fields for a new tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTab {
    pub role: TabRole,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

/// Partial update of a tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<TabRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl TabPatch {
    /// Merge every present field into `tab`.
    pub fn apply(&self, tab: &mut Tab) {
        if let Some(role) = self.role {
            tab.role = role;
        }
        if let Some(ref title) = self.title {
            tab.title = title.clone();
        }
        if let Some(ref content) = self.content {
            tab.content = content.clone();
        }
        if let Some(enabled) = self.enabled {
            tab.enabled = enabled;
        }
        if let Some(pinned) = self.pinned {
            tab.pinned = Some(pinned);
        }
    }
}

// =============================================================================
// Auth and request logs
// =============================================================================

/// Body of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// One proxied request as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    pub id: String,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub request: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A page of the request log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(default)]
    pub logs: Vec<RequestLog>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    crate::util::constants::DEFAULT_LOG_PAGE
}

// =============================================================================
// Toasts
// =============================================================================

/// Toast category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastType {
    Success,
    Error,
    Info,
    Warning,
}

impl ToastType {
    pub fn label(&self) -> &'static str {
        match self {
            ToastType::Success => "success",
            ToastType::Error => "error",
            ToastType::Info => "info",
            ToastType::Warning => "warning",
        }
    }
}

impl std::fmt::Display for ToastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    /// Client-generated; unique enough for a UI list, not globally.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ToastType,
    pub message: String,
    /// Display duration in milliseconds.
    pub duration: u64,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    /// Instant after which a presentation layer should dismiss the toast.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.duration).unwrap_or(i64::MAX);
        self.created_at
            .checked_add_signed(chrono::Duration::milliseconds(millis))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}
