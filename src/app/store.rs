// latex-proxy-client - app/store.rs
//
// The application store: one mutable `AppState` with explicit observers.
//
// - State is held as `Arc<AppState>` and mutated copy-on-write, so snapshots
//   handed to observers never change underneath them.
// - Mutators run synchronously on `&mut self`; two mutations cannot
//   interleave.
// - Lookups by id that miss are silent no-ops. Mutators never fail.
// - After each effective change the persisted subset is written to durable
//   storage (skipped when it did not change) and observers are notified.

use crate::app::session::{self, PersistedState, Session};
use crate::app::state::AppState;
use crate::core::model::{Profile, ProfilePatch, Tab, TabPatch, User};
use std::sync::Arc;

/// Handle returned by [`AppStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&Arc<AppState>)>;

/// Process-wide application state container.
pub struct AppStore {
    state: Arc<AppState>,
    session: Arc<Session>,
    last_persisted: PersistedState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("profiles", &self.state.profiles.len())
            .field("selected_profile_id", &self.state.selected_profile_id)
            .field("authenticated", &self.state.is_authenticated())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AppStore {
    /// Build the store, hydrating the persisted subset before anyone can
    /// observe it. The token always comes from the session.
    pub fn new(session: Arc<Session>) -> Self {
        let persisted = session::load_persisted(session.storage().as_ref()).unwrap_or_default();
        let mut state = AppState::from_persisted(persisted.clone());
        state.token = session.token();

        tracing::debug!(
            authenticated = state.is_authenticated(),
            selected = ?state.selected_profile_id,
            sidebar_open = state.is_sidebar_open,
            "Store hydrated"
        );

        Self {
            state: Arc::new(state),
            session,
            last_persisted: persisted,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Register `listener`; it receives a snapshot after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<AppState>) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Apply `f` to the state. `f` reports whether it changed anything; only
    /// effective changes are persisted and broadcast.
    fn update(&mut self, f: impl FnOnce(&mut AppState) -> bool) {
        if !f(Arc::make_mut(&mut self.state)) {
            return;
        }
        self.persist();
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }

    fn persist(&mut self) {
        let persisted = self.state.persisted();
        if persisted == self.last_persisted {
            return;
        }
        match session::save_persisted(self.session.storage().as_ref(), &persisted) {
            Ok(()) => self.last_persisted = persisted,
            Err(e) => tracing::warn!(error = %e, "Cannot persist store state"),
        }
    }

    // -------------------------------------------------------------------------
    // Auth and UI flags
    // -------------------------------------------------------------------------

    pub fn set_user(&mut self, user: Option<User>) {
        self.update(|s| {
            s.user = user;
            true
        });
    }

    /// Set or clear the bearer token through the session (which writes the
    /// `token` storage key) and mirror it into the state.
    pub fn set_token(&mut self, token: Option<&str>) {
        self.session.set_token(token);
        let token = self.session.token();
        self.update(|s| {
            if s.token == token {
                return false;
            }
            s.token = token;
            true
        });
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.update(|s| std::mem::replace(&mut s.is_loading, loading) != loading);
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.update(|s| std::mem::replace(&mut s.is_sidebar_open, open) != open);
    }

    pub fn toggle_sidebar(&mut self) {
        self.update(|s| {
            s.is_sidebar_open = !s.is_sidebar_open;
            true
        });
    }

    pub fn set_selected_profile_id(&mut self, id: Option<&str>) {
        let id = id.map(str::to_string);
        self.update(|s| {
            if s.selected_profile_id == id {
                return false;
            }
            s.selected_profile_id = id;
            true
        });
    }

    /// Sign out locally: token (and its storage key), user, profiles, and
    /// selection are cleared. The sidebar flag is left as it was.
    pub fn logout(&mut self) {
        self.session.clear();
        self.update(|s| {
            s.token = None;
            s.user = None;
            s.profiles.clear();
            s.selected_profile_id = None;
            true
        });
        tracing::info!("Logged out");
    }

    // -------------------------------------------------------------------------
    // Profiles
    // -------------------------------------------------------------------------

    /// Replace the whole list, as after a fetch.
    pub fn set_profiles(&mut self, profiles: Vec<Profile>) {
        self.update(|s| {
            s.profiles = profiles;
            true
        });
    }

    /// Append without checking for an existing id.
    pub fn add_profile(&mut self, profile: Profile) {
        self.update(|s| {
            s.profiles.push(profile);
            true
        });
    }

    pub fn update_profile(&mut self, id: &str, patch: &ProfilePatch) {
        self.update(|s| match s.profile_mut(id) {
            Some(profile) => {
                patch.apply(profile);
                true
            }
            None => false,
        });
    }

    /// Remove a profile; clears the selection if it pointed at it.
    pub fn remove_profile(&mut self, id: &str) {
        self.update(|s| {
            let before = s.profiles.len();
            s.profiles.retain(|p| p.id != id);
            let mut changed = s.profiles.len() != before;
            if s.selected_profile_id.as_deref() == Some(id) {
                s.selected_profile_id = None;
                changed = true;
            }
            changed
        });
    }

    // -------------------------------------------------------------------------
    // Tabs
    // -------------------------------------------------------------------------

    pub fn add_tab(&mut self, profile_id: &str, tab: Tab) {
        self.update(|s| match s.profile_mut(profile_id) {
            Some(profile) => {
                profile.tabs.push(tab);
                true
            }
            None => false,
        });
    }

    pub fn update_tab(&mut self, profile_id: &str, tab_id: &str, patch: &TabPatch) {
        self.update(|s| {
            let Some(profile) = s.profile_mut(profile_id) else {
                return false;
            };
            match profile.tabs.iter_mut().find(|t| t.id == tab_id) {
                Some(tab) => {
                    patch.apply(tab);
                    true
                }
                None => false,
            }
        });
    }

    /// Swap in `tab` for the tab with the same id, as returned by the server.
    /// Unlike `update_tab`, fields absent from `tab` are cleared locally too.
    pub fn replace_tab(&mut self, profile_id: &str, tab: Tab) {
        self.update(|s| {
            let Some(profile) = s.profile_mut(profile_id) else {
                return false;
            };
            match profile.tabs.iter_mut().find(|t| t.id == tab.id) {
                Some(existing) if *existing != tab => {
                    *existing = tab;
                    true
                }
                _ => false,
            }
        });
    }

    pub fn remove_tab(&mut self, profile_id: &str, tab_id: &str) {
        self.update(|s| {
            let Some(profile) = s.profile_mut(profile_id) else {
                return false;
            };
            let before = profile.tabs.len();
            profile.tabs.retain(|t| t.id != tab_id);
            profile.tabs.len() != before
        });
    }

    /// Replace a profile's tab sequence wholesale.
    pub fn reorder_tabs(&mut self, profile_id: &str, tabs: Vec<Tab>) {
        self.update(|s| match s.profile_mut(profile_id) {
            Some(profile) if profile.tabs != tabs => {
                profile.tabs = tabs;
                true
            }
            _ => false,
        });
    }

    // -------------------------------------------------------------------------
    // Derived accessors
    // -------------------------------------------------------------------------

    pub fn current_profile(&self) -> Option<&Profile> {
        self.state.current_profile()
    }

    pub fn current_tab(&self) -> Option<&Tab> {
        self.state.current_tab()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ProviderConfig, ProviderSource, TabRole};
    use crate::platform::storage::{KeyValueStore, MemoryStorage};
    use crate::util::constants::{STORE_KEY, TOKEN_KEY};
    use chrono::Utc;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tab(id: &str) -> Tab {
        Tab {
            id: id.to_string(),
            role: TabRole::User,
            title: id.to_string(),
            content: format!("content of {id}"),
            enabled: true,
            pinned: None,
        }
    }

    fn profile(id: &str, tabs: &[&str]) -> Profile {
        Profile {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: id.to_string(),
            tabs: tabs.iter().map(|t| tab(t)).collect(),
            active_tab_id: tabs.first().map(|t| t.to_string()),
            provider_source: ProviderSource::Profile,
            provider: ProviderConfig::default(),
            proxy_endpoint: None,
            proxy_api_key: None,
            proxy_model: None,
            merge_consecutive_roles: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store_with_storage() -> (AppStore, Arc<dyn KeyValueStore>) {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
        let session = Arc::new(Session::new(storage.clone()));
        (AppStore::new(session), storage)
    }

    fn store_with_profiles() -> AppStore {
        let (mut store, _) = store_with_storage();
        store.set_profiles(vec![profile("p1", &["a", "b"]), profile("p2", &["c"])]);
        store
    }

    #[test]
    fn test_store_and_session_agree_on_token_across_restart() {
        let (mut store, storage) = store_with_storage();
        store.set_token(Some("t1"));
        store.set_selected_profile_id(Some("p1"));
        assert_eq!(store.state().token, store.session().token());
        assert!(storage.get(STORE_KEY).unwrap().contains("t1"));

        store.logout();
        assert!(!store.state().is_authenticated());
        assert!(!store.session().is_authenticated());

        let restarted = AppStore::new(Arc::new(Session::new(storage.clone())));
        assert!(!restarted.state().is_authenticated());
        assert!(restarted.session().token().is_none());
        assert!(!storage.get(STORE_KEY).unwrap().contains("t1"));
    }

    #[test]
    fn test_session_cleared_elsewhere_does_not_resurrect_token() {
        let (mut store, storage) = store_with_storage();
        store.set_token(Some("t1"));
        store.session().clear();

        let restarted = AppStore::new(Arc::new(Session::new(storage.clone())));
        assert!(restarted.state().token.is_none());
        assert!(restarted.session().token().is_none());
    }

    #[test]
    fn test_replace_tab_overwrites_every_field() {
        let mut store = store_with_profiles();
        store.update_tab(
            "p1",
            "a",
            &TabPatch {
                pinned: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(store.state().profile("p1").unwrap().tab("a").unwrap().pinned, Some(true));

        let mut server_copy = tab("a");
        server_copy.title = "From server".to_string();
        store.replace_tab("p1", server_copy.clone());

        let local = store.state().profile("p1").unwrap().tab("a").unwrap().clone();
        assert_eq!(local, server_copy);
        assert_eq!(local.pinned, None);
        assert_eq!(tab_ids_of(&store, "p1"), vec!["a", "b"]);
    }

    #[test]
    fn test_replace_unknown_tab_is_noop() {
        let mut store = store_with_profiles();
        let before = store.snapshot();
        store.replace_tab("p1", tab("zzz"));
        store.replace_tab("missing", tab("a"));
        assert_eq!(*store.snapshot(), *before);
    }

    fn tab_ids_of(store: &AppStore, profile_id: &str) -> Vec<String> {
        store
            .state()
            .profile(profile_id)
            .unwrap()
            .tabs
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    #[test]
    fn test_update_missing_profile_is_noop() {
        let mut store = store_with_profiles();
        let before = store.snapshot();
        store.update_profile(
            "missing",
            &ProfilePatch {
                name: Some("x".to_string()),
                ..Default::default()
            },
        );
        store.update_tab(
            "missing",
            "a",
            &TabPatch {
                title: Some("x".to_string()),
                ..Default::default()
            },
        );
        store.update_tab(
            "p1",
            "missing",
            &TabPatch {
                title: Some("x".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn test_update_profile_merges_patch() {
        let mut store = store_with_profiles();
        store.update_profile(
            "p2",
            &ProfilePatch {
                name: Some("Renamed".to_string()),
                merge_consecutive_roles: Some(true),
                ..Default::default()
            },
        );
        let p2 = store.state().profile("p2").unwrap();
        assert_eq!(p2.name, "Renamed");
        assert!(p2.merge_consecutive_roles);
        assert_eq!(p2.tabs.len(), 1);
    }

    #[test]
    fn test_add_profile_appends_without_dedup() {
        let mut store = store_with_profiles();
        store.add_profile(profile("p1", &[]));
        let ids: Vec<&str> = store.state().profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p1"]);
    }

    #[test]
    fn test_remove_selected_profile_clears_selection() {
        let mut store = store_with_profiles();
        store.set_selected_profile_id(Some("p1"));
        store.remove_profile("p1");
        assert!(store.current_profile().is_none());
        assert!(store.state().selected_profile_id.is_none());
    }

    #[test]
    fn test_remove_other_profile_keeps_current() {
        let mut store = store_with_profiles();
        store.set_selected_profile_id(Some("p1"));
        let before = store.current_profile().cloned();
        store.remove_profile("p2");
        assert_eq!(store.current_profile().cloned(), before);
        assert_eq!(store.state().profiles.len(), 1);
    }

    #[test]
    fn test_tab_mutations() {
        let mut store = store_with_profiles();
        store.add_tab("p2", tab("d"));
        store.update_tab(
            "p2",
            "d",
            &TabPatch {
                enabled: Some(false),
                ..Default::default()
            },
        );
        store.remove_tab("p2", "c");

        let p2 = store.state().profile("p2").unwrap();
        assert_eq!(p2.tabs.len(), 1);
        assert_eq!(p2.tabs[0].id, "d");
        assert!(!p2.tabs[0].enabled);

        // Unknown profile: nothing happens.
        store.add_tab("missing", tab("z"));
        store.remove_tab("missing", "d");
        assert_eq!(store.state().profiles.len(), 2);
    }

    #[test]
    fn test_reorder_tabs_is_idempotent() {
        let mut store = store_with_profiles();
        let reordered = vec![tab("b"), tab("a")];

        store.reorder_tabs("p1", reordered.clone());
        let once = store.snapshot();
        store.reorder_tabs("p1", reordered);
        let twice = store.snapshot();

        assert_eq!(*once, *twice);
        let ids: Vec<&str> = twice.profile("p1").unwrap().tabs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_current_tab_follows_active_tab_id() {
        let mut store = store_with_profiles();
        assert!(store.current_tab().is_none());
        store.set_selected_profile_id(Some("p1"));
        assert_eq!(store.current_tab().map(|t| t.id.as_str()), Some("a"));
        store.update_profile(
            "p1",
            &ProfilePatch {
                active_tab_id: Some(Some("b".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(store.current_tab().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn test_set_token_round_trip_through_storage() {
        let (mut store, storage) = store_with_storage();
        store.set_token(Some("abc"));
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("abc"));
        assert!(store.state().is_authenticated());
        assert!(store.session().is_authenticated());

        store.set_token(None);
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert!(!store.state().is_authenticated());
    }

    #[test]
    fn test_logout_keeps_sidebar_flag() {
        let (mut store, storage) = store_with_storage();
        store.set_token(Some("abc"));
        store.set_profiles(vec![profile("p1", &["a"])]);
        store.set_selected_profile_id(Some("p1"));
        store.set_sidebar_open(false);

        store.logout();

        let state = store.snapshot();
        assert!(state.token.is_none());
        assert!(state.user.is_none());
        assert!(state.profiles.is_empty());
        assert!(state.selected_profile_id.is_none());
        assert!(!state.is_sidebar_open);
        assert_eq!(storage.get(TOKEN_KEY), None);
    }

    #[test]
    fn test_persisted_subset_written_and_rehydrated() {
        let (mut store, storage) = store_with_storage();
        store.set_token(Some("abc"));
        store.set_profiles(vec![profile("p1", &["a"])]);
        store.set_selected_profile_id(Some("p1"));
        store.toggle_sidebar();

        let raw = storage.get(STORE_KEY).unwrap();
        let persisted: PersistedState = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.token.as_deref(), Some("abc"));
        assert_eq!(persisted.selected_profile_id.as_deref(), Some("p1"));
        assert!(!persisted.is_sidebar_open);

        let restarted = AppStore::new(Arc::new(Session::new(storage)));
        let state = restarted.state();
        assert_eq!(state.token.as_deref(), Some("abc"));
        assert_eq!(state.selected_profile_id.as_deref(), Some("p1"));
        assert!(!state.is_sidebar_open);
        assert!(state.profiles.is_empty());
        assert!(state.user.is_none());
    }

    #[test]
    fn test_subscribers_receive_snapshots_until_unsubscribed() {
        let mut store = store_with_profiles();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |state| sink.borrow_mut().push(state.profiles.len()));

        store.add_profile(profile("p3", &[]));
        store.update_profile("missing", &ProfilePatch::default());
        store.remove_profile("p1");
        assert!(store.unsubscribe(id));
        store.add_profile(profile("p4", &[]));

        assert_eq!(*seen.borrow(), vec![3, 2]);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn test_snapshot_is_immutable_after_later_changes() {
        let mut store = store_with_profiles();
        let before = store.snapshot();
        store.remove_profile("p1");
        assert_eq!(before.profiles.len(), 2);
        assert_eq!(store.state().profiles.len(), 1);
    }

    #[test]
    fn test_loading_flag_only_broadcasts_on_change() {
        let mut store = store_with_profiles();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        store.subscribe(move |_| *sink.borrow_mut() += 1);

        store.set_loading(true);
        store.set_loading(true);
        store.set_loading(false);
        assert_eq!(*count.borrow(), 2);
    }
}
