//! Local key/value storage for UI preferences and the persisted session.
//!
//! Preferences live in `prefs.json`, a flat JSON object; the dark-mode flag
//! is stored under the fixed key [`DARK_MODE_KEY`]. The last session is kept
//! in `session.json` so it can be restored on the next launch.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use taskflow_proto::auth::Session;

/// Key of the dark-mode preference.
pub const DARK_MODE_KEY: &str = "darkMode";

const PREFS_FILE: &str = "prefs.json";
const SESSION_FILE: &str = "session.json";

/// Errors from reading or writing local storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A stored file was not valid JSON of the expected shape.
    #[error("corrupt storage file {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// File-backed local storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory (`~/.local/share/taskflow` on Linux).
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|d| Self::new(d.join("taskflow")))
    }

    /// Directory this store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the dark-mode flag. Missing or unreadable storage reads as `false`.
    #[must_use]
    pub fn load_dark_mode(&self) -> bool {
        match self.read_prefs() {
            Ok(prefs) => prefs
                .get(DARK_MODE_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "could not read preferences");
                false
            }
        }
    }

    /// Persists the dark-mode flag, keeping any other stored preferences.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the preferences file cannot be written.
    pub fn save_dark_mode(&self, enabled: bool) -> Result<(), StorageError> {
        let mut prefs = self.read_prefs().unwrap_or_default();
        prefs.insert(DARK_MODE_KEY.to_string(), Value::Bool(enabled));
        self.write_json(PREFS_FILE, &Value::Object(prefs))
    }

    /// Reads the persisted session, if one was saved and is readable.
    #[must_use]
    pub fn load_session(&self) -> Option<Session> {
        let path = self.dir.join(SESSION_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read session");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt session");
                None
            }
        }
    }

    /// Persists `session` for the next launch.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the session file cannot be written.
    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let path = self.dir.join(SESSION_FILE);
        let value = serde_json::to_value(session).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        self.write_json(SESSION_FILE, &value)?;
        restrict_to_owner(&path)
    }

    /// Removes the persisted session. Removing a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file exists but cannot be removed.
    pub fn clear_session(&self) -> Result<(), StorageError> {
        let path = self.dir.join(SESSION_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn read_prefs(&self) -> Result<Map<String, Value>, StorageError> {
        let path = self.dir.join(PREFS_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| StorageError::Json { path, source })
    }

    fn write_json(&self, file: &str, value: &Value) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file);
        let contents = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, contents).map_err(|source| StorageError::Io { path, source })
    }
}

/// Makes `path` readable and writable by its owner only; it holds tokens.
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|source| {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_to_owner(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}
