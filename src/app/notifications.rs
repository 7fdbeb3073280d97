// latex-proxy-client - app/notifications.rs
//
// Toast notification store: an ordered list of ephemeral messages,
// independent of the application store.
//
// Expiry is not handled here. A presentation layer decides when to call
// `remove`, typically once `Toast::is_expired` turns true.

use crate::core::model::{Toast, ToastType};
use crate::util::constants::{DEFAULT_TOAST_DURATION_MS, TOAST_ID_LEN};
use rand::Rng;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Handle returned by [`NotificationStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ToastListener = Box<dyn Fn(&[Toast]) + Send>;

/// Ordered queue of toasts with change listeners.
#[derive(Default)]
pub struct NotificationStore {
    toasts: Vec<Toast>,
    listeners: Vec<(ListenerId, ToastListener)>,
    next_listener: u64,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("toasts", &self.toasts)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts in insertion order.
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// Append a toast and return its generated id.
    ///
    /// `duration_ms` defaults to 3000 when `None`.
    pub fn add(&mut self, kind: ToastType, message: &str, duration_ms: Option<u64>) -> String {
        let id = generate_id();
        let toast = Toast {
            id: id.clone(),
            kind,
            message: message.to_string(),
            duration: duration_ms.unwrap_or(DEFAULT_TOAST_DURATION_MS),
            created_at: chrono::Utc::now(),
        };
        tracing::debug!(id = %toast.id, kind = %kind, "Toast added");
        self.toasts.push(toast);
        self.notify();
        id
    }

    /// Remove the toast with `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        if self.toasts.len() != before {
            self.notify();
        }
    }

    /// Remove every toast.
    pub fn clear(&mut self) {
        self.toasts.clear();
        self.notify();
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&[Toast]) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.toasts);
        }
    }
}

/// Pseudo-random base-36 id. Collision-resistant enough for a UI list only.
fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..TOAST_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

// =============================================================================
// Process-wide store
// =============================================================================

static GLOBAL: OnceLock<Mutex<NotificationStore>> = OnceLock::new();

/// The process-wide notification store used by [`show_toast`].
pub fn global() -> &'static Mutex<NotificationStore> {
    GLOBAL.get_or_init(|| Mutex::new(NotificationStore::new()))
}

/// Add a toast to the process-wide store from code that holds no store
/// handle (error paths, background tasks). Returns the new toast's id.
pub fn show_toast(kind: ToastType, message: &str, duration_ms: Option<u64>) -> String {
    global()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .add(kind, message, duration_ms)
}

/// Take every toast out of the process-wide store, oldest first.
pub fn drain_global() -> Vec<Toast> {
    let mut store = global().lock().unwrap_or_else(PoisonError::into_inner);
    let toasts = store.toasts().to_vec();
    store.clear();
    toasts
}
