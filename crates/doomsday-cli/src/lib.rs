#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end for a doomsday certificate expiry server.
//!
//! Layout:
//! - `cli.rs`: argument parsing and the `run()` entry point
//! - `registry.rs`: verbs, the handler trait, and the verb-to-handler table
//! - `dispatch.rs`: session loading, client bootstrap, and persistence around a handler
//! - `client.rs`: the per-target HTTP client, error types, and error translation
//! - `commands/`: verb handlers grouped by concern
//! - `output.rs`: renderers and formatting helpers
//! - `duration.rs`: `1y2d3h4m` duration flags
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod dispatch;
pub(crate) mod duration;
pub(crate) mod output;
pub(crate) mod registry;

pub use cli::run;
