// latex-proxy-client - app/state.rs
//
// Application state: authentication, the profile list, and UI flags.
// Owned by `AppStore`; observers only ever see immutable snapshots.

use crate::app::session::PersistedState;
use crate::core::model::{Profile, Tab, User};

/// Top-level application state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Read-through copy of the signed-in user.
    pub user: Option<User>,

    /// Bearer token mirrored from the session.
    pub token: Option<String>,

    /// Profiles in server order, each with its ordered tabs.
    pub profiles: Vec<Profile>,

    /// Profile the UI is showing. May reference a profile that no longer
    /// exists; every read goes through a lookup.
    pub selected_profile_id: Option<String>,

    /// Whether a fetch is in flight.
    pub is_loading: bool,

    pub is_sidebar_open: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_persisted(PersistedState::default())
    }
}

impl AppState {
    /// Initial state with the persisted subset merged in.
    pub fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            user: None,
            token: persisted.token,
            profiles: Vec::new(),
            selected_profile_id: persisted.selected_profile_id,
            is_loading: false,
            is_sidebar_open: persisted.is_sidebar_open,
        }
    }

    /// Always the presence of a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The subset that survives a restart.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            token: self.token.clone(),
            selected_profile_id: self.selected_profile_id.clone(),
            is_sidebar_open: self.is_sidebar_open,
        }
    }

    /// Profile with the given id, if present.
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub(crate) fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// The selected profile; `None` when nothing is selected or the selection
    /// no longer resolves.
    pub fn current_profile(&self) -> Option<&Profile> {
        self.selected_profile_id
            .as_deref()
            .and_then(|id| self.profile(id))
    }

    /// The current profile's active tab, if both resolve.
    pub fn current_tab(&self) -> Option<&Tab> {
        self.current_profile().and_then(Profile::active_tab)
    }
}
