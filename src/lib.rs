// latex-proxy-client - lib.rs
//
// Library entry point: the client data layer for the latex-proxy backend.
// The `latex-proxy` binary in `main.rs` is a thin command-line driver on top.

pub mod api;
pub mod app;
pub mod core;
pub mod platform;
pub mod util;
