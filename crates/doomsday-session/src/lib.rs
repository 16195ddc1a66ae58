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

//! File-backed target store for the doomsday CLI.
//!
//! Layout: `model.rs` (target records and the session document), `store.rs`
//! (load/save against the persisted YAML file), `error.rs` (typed failures).

pub mod error;
pub mod model;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use model::{SessionConfig, TargetRecord};
pub use store::{DEFAULT_SESSION_FILE, default_path, load, save};
