//! Load and save the session document on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{SessionError, SessionResult};
use crate::model::SessionConfig;

/// File name of the session document inside the home directory.
pub const DEFAULT_SESSION_FILE: &str = ".doomsdayconfig";

/// Default session location: `~/.doomsdayconfig`.
///
/// # Errors
///
/// Returns [`SessionError::HomeDirUnavailable`] when no home directory is known.
pub fn default_path() -> SessionResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_SESSION_FILE))
        .ok_or(SessionError::HomeDirUnavailable)
}

/// Read the session document at `path`.
///
/// A missing file is a first run and yields an empty session.
///
/// # Errors
///
/// Returns [`SessionError::Read`] for IO failures other than "not found" and
/// [`SessionError::Parse`] for malformed contents.
pub fn load(path: &Path) -> SessionResult<SessionConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "session file missing; starting empty");
            return Ok(SessionConfig::default());
        }
        Err(source) => {
            return Err(SessionError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    SessionConfig::from_yaml(&contents).map_err(|source| SessionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist `config` to `path`, replacing any previous contents atomically.
///
/// The document is written to a sibling temporary file (created with mode
/// `0600` on unix, since it carries tokens) and renamed over `path`.
///
/// # Errors
///
/// Returns [`SessionError::Serialize`] if rendering fails and
/// [`SessionError::Write`] for any filesystem failure.
pub fn save(config: &SessionConfig, path: &Path) -> SessionResult<()> {
    let rendered = config
        .to_yaml()
        .map_err(|source| SessionError::Serialize { source })?;
    let write_error = |source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
    staged
        .write_all(rendered.as_bytes())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(write_error)?;
    staged.persist(path).map_err(|err| write_error(err.error))?;

    tracing::debug!(path = %path.display(), "session saved");
    Ok(())
}
