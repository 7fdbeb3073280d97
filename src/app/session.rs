// latex-proxy-client - app/session.rs
//
// Credential holder and persisted-state snapshot.
//
// `Session` is the single authority for the bearer token. The API client and
// the application store share one `Arc<Session>`, so the client can read the
// token synchronously without waiting for the store to hydrate, and there is
// exactly one code path that writes the `token` storage key. Outside the
// crate the token is read-only here; it changes through `AppStore`, which
// mirrors it into the state it broadcasts.
//
// The persisted store subset lives under its own key as a JSON object
// `{token, selectedProfileId, isSidebarOpen}`. Load errors are discarded:
// a corrupt or incompatible snapshot just starts the client fresh.

use crate::platform::storage::KeyValueStore;
use crate::util::constants::{STORE_KEY, TOKEN_KEY};
use crate::util::error::StorageError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// Persisted store subset
// =============================================================================

/// The part of the application state that survives a restart.
///
/// User and profile data are deliberately absent; they are always re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub selected_profile_id: Option<String>,

    #[serde(default = "default_sidebar_open")]
    pub is_sidebar_open: bool,
}

fn default_sidebar_open() -> bool {
    true
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            token: None,
            selected_profile_id: None,
            is_sidebar_open: default_sidebar_open(),
        }
    }
}

/// Load the persisted subset. `None` when absent or malformed.
pub fn load_persisted(storage: &dyn KeyValueStore) -> Option<PersistedState> {
    let raw = storage.get(STORE_KEY)?;
    serde_json::from_str(&raw)
        .map_err(|e| {
            tracing::warn!(
                key = STORE_KEY,
                error = %e,
                "Persisted state is malformed; starting fresh"
            );
        })
        .ok()
}

/// Write the persisted subset under the store key.
pub fn save_persisted(
    storage: &dyn KeyValueStore,
    state: &PersistedState,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(state).map_err(|source| StorageError::Json {
        path: STORE_KEY.into(),
        source,
    })?;
    storage.set(STORE_KEY, &json)
}

// =============================================================================
// Session
// =============================================================================

/// Shared holder of the current bearer token.
pub struct Session {
    storage: Arc<dyn KeyValueStore>,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token itself is never printed.
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session over `storage`, reading the token synchronously.
    ///
    /// The raw `token` key wins; a token found only inside the persisted
    /// snapshot (written by an older client) is adopted and re-written under
    /// the raw key.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let raw = storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let token = match raw {
            Some(token) => Some(token),
            None => {
                let adopted = load_persisted(storage.as_ref())
                    .and_then(|p| p.token)
                    .filter(|t| !t.is_empty());
                if let Some(ref token) = adopted {
                    if let Err(e) = storage.set(TOKEN_KEY, token) {
                        tracing::warn!(error = %e, "Cannot store adopted token");
                    }
                }
                adopted
            }
        };

        tracing::debug!(authenticated = token.is_some(), "Session created");

        Self {
            storage,
            token: RwLock::new(token),
        }
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the token. Empty strings count as no token.
    ///
    /// A present token is written to the `token` key; an absent one removes
    /// the key and also drops the token from the persisted snapshot, so a
    /// later `Session::new` cannot adopt it again. Storage failures are
    /// logged; the in-memory token still changes so the running client stays
    /// consistent.
    pub(crate) fn set_token(&self, token: Option<&str>) {
        let token = token.filter(|t| !t.is_empty()).map(str::to_string);

        let result = match token {
            Some(ref t) => self.storage.set(TOKEN_KEY, t),
            None => self.storage.remove(TOKEN_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Cannot persist token");
        }
        if token.is_none() {
            self.forget_snapshot_token();
        }

        tracing::debug!(authenticated = token.is_some(), "Session token updated");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Forget the token (same as `set_token(None)`).
    pub(crate) fn clear(&self) {
        self.set_token(None);
    }

    fn forget_snapshot_token(&self) {
        let Some(mut persisted) = load_persisted(self.storage.as_ref()) else {
            return;
        };
        if persisted.token.take().is_none() {
            return;
        }
        if let Err(e) = save_persisted(self.storage.as_ref(), &persisted) {
            tracing::warn!(error = %e, "Cannot remove token from persisted state");
        }
    }

    /// Storage shared with the application store.
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }
}
