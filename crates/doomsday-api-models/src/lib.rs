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
//! HTTP DTOs exchanged with a doomsday server.
//!
//! Only the fields the CLI renders are modelled; unknown response fields are
//! ignored by serde.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header carrying the session token on authenticated requests.
pub const TOKEN_HEADER: &str = "X-Doomsday-Token";

/// RFC9457-style problem document returned on failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Short, human-readable summary of the issue.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    /// Legacy single-field error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProblemDetails {
    /// Most specific message available, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.error.as_deref())
            .or_else(|| Some(self.title.as_str()).filter(|title| !title.is_empty()))
    }
}

/// Authentication scheme a server expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// The server accepts unauthenticated requests.
    #[serde(alias = "None")]
    None,
    /// The server issues tokens for a username and password.
    #[serde(alias = "Userpass")]
    Userpass,
}

impl AuthType {
    /// Lowercase label used in CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Userpass => "userpass",
        }
    }
}

/// Response body of `GET /v1/info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoResponse {
    /// Server version string.
    pub version: String,
    /// Authentication scheme in effect.
    pub auth_type: AuthType,
}

/// Request body of `POST /v1/auth`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRequest {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Response body of `POST /v1/auth`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    /// Token to present on subsequent requests.
    pub token: String,
}

/// Where a certificate was discovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheItemPath {
    /// Backend name as configured on the server.
    pub backend: String,
    /// Location of the certificate within the backend.
    pub location: String,
}

/// One tracked certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheItem {
    /// Certificate subject common name.
    pub common_name: String,
    /// Expiry as unix seconds.
    pub not_after: i64,
    /// Every location the certificate was seen at.
    #[serde(default)]
    pub paths: Vec<CacheItemPath>,
}

impl CacheItem {
    /// Expiry as a UTC timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.not_after, 0)
    }
}

/// Response body of `GET /v1/cache`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheResponse {
    /// Cached certificates.
    #[serde(default)]
    pub content: Vec<CacheItem>,
}

/// A unit of work queued in the server's refresh scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerTask {
    /// Scheduler-assigned identifier.
    pub id: u64,
    /// Scheduled start as unix seconds.
    pub at: i64,
    /// Backend the task refreshes.
    pub backend: String,
    /// Why the task was scheduled.
    #[serde(default)]
    pub reason: String,
    /// Task kind (`auth` or `refresh`).
    #[serde(default)]
    pub kind: String,
    /// Whether the task is eligible to run now.
    #[serde(default)]
    pub ready: bool,
}

/// Response body of `GET /v1/scheduler`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerInfo {
    /// Number of worker routines.
    #[serde(default)]
    pub workers: u32,
    /// Tasks waiting for a worker.
    #[serde(default)]
    pub pending: Vec<SchedulerTask>,
    /// Tasks currently executing.
    #[serde(default)]
    pub running: Vec<SchedulerTask>,
}
