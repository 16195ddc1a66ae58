//! Verb handlers grouped by concern.

pub(crate) mod certs;
pub(crate) mod info;
pub(crate) mod login;
pub(crate) mod scheduler;
pub(crate) mod server;
pub(crate) mod targets;
