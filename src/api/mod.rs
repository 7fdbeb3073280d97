// latex-proxy-client - api/mod.rs
//
// Backend API layer: HTTP transport seam and the typed API client.
// Dependencies: core (model), util (errors, constants), app::session (token).
// Must NOT depend on: the stores.

pub mod client;
pub mod transport;
