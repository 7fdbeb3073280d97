// latex-proxy-client - app/sync.rs
//
// Coordination between API calls and the application store.
//
// Each helper performs the server call first and applies the confirmed
// result locally, so the store only ever reflects what the server accepted.
// The one exception is `move_tabs`, which reorders locally before the call
// (drag-and-drop must feel instant) and restores the previous order if the
// server rejects it.
//
// Concurrent calls are not de-duplicated: two overlapping updates to the
// same profile race at the network layer and the last response applied wins.

use crate::api::client::ApiClient;
use crate::app::store::AppStore;
use crate::core::model::{NewProfile, NewTab, Profile, ProfilePatch, Tab, TabPatch, User};
use crate::util::error::ApiError;

/// Log in and store the token and user.
pub async fn sign_in(
    api: &ApiClient,
    store: &mut AppStore,
    login: &str,
    password: &str,
) -> Result<User, ApiError> {
    let auth = api.login(login, password).await?;
    store.set_token(Some(auth.token.as_str()));
    store.set_user(Some(auth.user.clone()));
    tracing::info!(user = %auth.user.login, "Signed in");
    Ok(auth.user)
}

/// Register a new account and sign in with it.
pub async fn sign_up(
    api: &ApiClient,
    store: &mut AppStore,
    login: &str,
    password: &str,
) -> Result<User, ApiError> {
    let auth = api.register(login, password).await?;
    store.set_token(Some(auth.token.as_str()));
    store.set_user(Some(auth.user.clone()));
    tracing::info!(user = %auth.user.login, "Registered");
    Ok(auth.user)
}

/// Local sign-out. The backend keeps no session state to invalidate.
pub fn sign_out(store: &mut AppStore) {
    store.logout();
}

/// Re-fetch the user and the profile list, replacing local copies.
///
/// A selection that no longer resolves falls back to the user's active
/// profile when that exists in the fresh list, and is cleared otherwise.
/// The loading flag is raised for the duration and always lowered.
pub async fn refresh(api: &ApiClient, store: &mut AppStore) -> Result<(), ApiError> {
    store.set_loading(true);
    let result = fetch_user_and_profiles(api).await;
    store.set_loading(false);

    let (user, profiles) = result?;

    let selected = store.state().selected_profile_id.clone();
    let selection_valid = selected
        .as_deref()
        .is_some_and(|id| profiles.iter().any(|p| p.id == id));
    let fallback = user
        .active_profile_id
        .as_deref()
        .filter(|id| profiles.iter().any(|p| p.id == *id))
        .map(str::to_string);

    tracing::debug!(profiles = profiles.len(), "Profiles refreshed");
    store.set_user(Some(user));
    store.set_profiles(profiles);

    if !selection_valid {
        if selected.is_some() {
            tracing::debug!(selected = ?selected, fallback = ?fallback, "Repairing dangling selection");
        }
        store.set_selected_profile_id(fallback.as_deref());
    }
    Ok(())
}

async fn fetch_user_and_profiles(api: &ApiClient) -> Result<(User, Vec<Profile>), ApiError> {
    let user = api.get_user().await?;
    let profiles = api.get_profiles().await?;
    Ok((user, profiles))
}

/// Make `profile_id` the user's active profile, then select it locally.
///
/// The local selection only changes after the server confirms; a failed
/// call leaves the store untouched.
pub async fn select_profile(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
) -> Result<(), ApiError> {
    let echoed = api.update_active_profile(profile_id).await?;
    let confirmed = echoed.unwrap_or_else(|| profile_id.to_string());

    let user = store.state().user.clone().map(|mut u| {
        u.active_profile_id = Some(confirmed.clone());
        u
    });
    if user.is_some() {
        store.set_user(user);
    }
    store.set_selected_profile_id(Some(confirmed.as_str()));
    Ok(())
}

pub async fn create_profile(
    api: &ApiClient,
    store: &mut AppStore,
    profile: &NewProfile,
) -> Result<Profile, ApiError> {
    let created = api.create_profile(profile).await?;
    store.add_profile(created.clone());
    Ok(created)
}

pub async fn clone_profile(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
) -> Result<Profile, ApiError> {
    let cloned = api.clone_profile(profile_id).await?;
    store.add_profile(cloned.clone());
    Ok(cloned)
}

/// Send `patch`, then apply the server's version of the profile locally.
pub async fn update_profile(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
    patch: &ProfilePatch,
) -> Result<Profile, ApiError> {
    let updated = api.update_profile(profile_id, patch).await?;
    store.update_profile(profile_id, &ProfilePatch::from_profile(&updated));
    Ok(updated)
}

pub async fn delete_profile(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
) -> Result<(), ApiError> {
    api.delete_profile(profile_id).await?;
    store.remove_profile(profile_id);
    Ok(())
}

/// Persist a new profile display order on the user.
pub async fn reorder_profiles(
    api: &ApiClient,
    store: &mut AppStore,
    order: Vec<String>,
) -> Result<(), ApiError> {
    api.update_profile_order(&order).await?;
    let user = store.state().user.clone().map(|mut u| {
        u.profile_order = Some(order);
        u
    });
    if user.is_some() {
        store.set_user(user);
    }
    Ok(())
}

pub async fn set_logging(
    api: &ApiClient,
    store: &mut AppStore,
    enabled: bool,
) -> Result<(), ApiError> {
    api.update_user_logging(enabled).await?;
    let user = store.state().user.clone().map(|mut u| {
        u.logging_enabled = enabled;
        u
    });
    if user.is_some() {
        store.set_user(user);
    }
    Ok(())
}

pub async fn create_tab(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
    tab: &NewTab,
) -> Result<Tab, ApiError> {
    let created = api.create_tab(profile_id, tab).await?;
    store.add_tab(profile_id, created.clone());
    Ok(created)
}

/// Send `patch`, then replace the local tab with the server's copy.
pub async fn update_tab(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
    tab_id: &str,
    patch: &TabPatch,
) -> Result<Tab, ApiError> {
    let updated = api.update_tab(profile_id, tab_id, patch).await?;
    store.replace_tab(profile_id, updated.clone());
    Ok(updated)
}

pub async fn delete_tab(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
    tab_id: &str,
) -> Result<(), ApiError> {
    api.delete_tab(profile_id, tab_id).await?;
    store.remove_tab(profile_id, tab_id);
    Ok(())
}

/// Reorder tabs optimistically, then confirm with the server.
///
/// On failure the previous order is restored before the error is returned.
/// When the server echoes the profile, its tab order is adopted.
pub async fn move_tabs(
    api: &ApiClient,
    store: &mut AppStore,
    profile_id: &str,
    tabs: Vec<Tab>,
) -> Result<(), ApiError> {
    let Some(previous) = store.state().profile(profile_id).map(|p| p.tabs.clone()) else {
        tracing::debug!(profile_id, "move_tabs on unknown profile ignored");
        return Ok(());
    };

    store.reorder_tabs(profile_id, tabs.clone());
    match api.move_tabs(profile_id, &tabs).await {
        Ok(Some(profile)) => {
            store.reorder_tabs(profile_id, profile.tabs);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(profile_id, error = %e, "Tab move rejected; restoring previous order");
            store.reorder_tabs(profile_id, previous);
            Err(e)
        }
    }
}
