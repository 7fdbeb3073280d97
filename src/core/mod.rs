// latex-proxy-client - core/mod.rs
//
// Shared data model.
// Dependencies: serde, chrono only.
// Must NOT depend on: app, platform, api, or any I/O.

pub mod model;
