// latex-proxy-client - app/mod.rs
//
// Application layer: credential session, state stores, and the helpers that
// keep the store in step with the backend.
// Dependencies: core, platform (storage), api.

pub mod notifications;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
