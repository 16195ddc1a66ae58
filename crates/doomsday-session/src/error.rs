//! Error types for session store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures raised while reading, mutating, or persisting the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session file exists but could not be read.
    #[error("failed to read session file `{}`", path.display())]
    Read {
        /// Location of the session file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The session file contents were not a valid session document.
    #[error("session file `{}` is malformed", path.display())]
    Parse {
        /// Location of the session file.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// The in-memory session could not be rendered.
    #[error("failed to serialize session")]
    Serialize {
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Writing the session file failed.
    #[error("failed to write session file `{}`", path.display())]
    Write {
        /// Location of the session file.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// No home directory could be resolved for the default session path.
    #[error("unable to determine home directory for the default session file")]
    HomeDirUnavailable,
    /// A named target does not exist in the session.
    #[error("no target with name `{name}`")]
    UnknownTarget {
        /// Requested target name.
        name: String,
    },
}
