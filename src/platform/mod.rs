// latex-proxy-client - platform/mod.rs
//
// Platform abstraction layer: directories, config.toml, durable storage.
// Dependencies: standard library, directories crate, util.
// Must NOT depend on: core, app, api.

pub mod config;
pub mod storage;
