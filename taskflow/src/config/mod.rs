//! Client settings.
//!
//! Each setting is taken from the first source that has it:
//! command-line flag, environment variable (through clap's `env`), the TOML
//! file at `~/.config/taskflow/config.toml`, then the built-in default.
//!
//! The default file is optional. A file named with `--config` must exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::backend::rest::RestConfig;
use crate::storage::LocalStore;

const DEFAULT_SITE_URL: &str = "http://localhost:5173";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Why the settings file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists (or was named explicitly) but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    ReadFile {
        /// File that was opened.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid settings file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Settings file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    backend: BackendSection,
    ui: UiSection,
    storage: StorageSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendSection {
    url: Option<String>,
    anon_key: Option<String>,
    site_url: Option<String>,
    request_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UiSection {
    poll_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    data_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// `~/.config/taskflow/config.toml`, if the platform has a config dir.
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskflow").join("config.toml"))
    }

    /// Reads `explicit`, or the default path when `None`.
    ///
    /// Only an explicitly named file is required to exist.
    fn read(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::ReadFile { path, source }),
        }
    }
}

/// Settings after every source has been applied.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hosted project URL; `None` leaves the backend unconfigured.
    pub url: Option<String>,
    /// Hosted project's public anon key.
    pub anon_key: Option<String>,
    /// Where the app is served; reset emails link to `{site_url}/reset-password`.
    pub site_url: String,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
    /// Bound of the worker's command and event queues.
    pub channel_capacity: usize,
    /// Use the seeded in-memory backend.
    pub offline: bool,
    /// How long the UI loop waits for a key before redrawing.
    pub poll_timeout: Duration,
    /// Overrides the platform data dir for prefs and the saved session.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            site_url: DEFAULT_SITE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            offline: false,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Reads the settings file and layers `cli` over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings file is unreadable or
    /// malformed, or when `--config` names a file that does not exist.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = ConfigFile::read(cli.config.as_deref())?;
        Ok(Self::merge(cli, file))
    }

    /// Settings from `cli` alone, used when the settings file is unusable.
    #[must_use]
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self::merge(cli, ConfigFile::default())
    }

    fn merge(cli: &CliArgs, file: ConfigFile) -> Self {
        let ConfigFile {
            backend,
            ui,
            storage,
        } = file;

        Self {
            url: cli.url.clone().or(backend.url),
            anon_key: cli.anon_key.clone().or(backend.anon_key),
            site_url: cli
                .site_url
                .clone()
                .or(backend.site_url)
                .unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            request_timeout: backend
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            // Bounded channels need room for at least one message.
            channel_capacity: backend
                .channel_capacity
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
                .max(1),
            offline: cli.offline,
            poll_timeout: ui
                .poll_timeout_ms
                .map_or(DEFAULT_POLL_TIMEOUT, Duration::from_millis),
            data_dir: cli.data_dir.clone().or(storage.data_dir),
        }
    }

    /// HTTP backend settings, or `None` unless both URL and key are non-blank.
    #[must_use]
    pub fn to_rest_config(&self) -> Option<RestConfig> {
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(RestConfig {
            url: non_blank(self.url.as_deref())?,
            anon_key: non_blank(self.anon_key.as_deref())?,
            request_timeout: self.request_timeout,
        })
    }

    /// Store for prefs and the saved session.
    #[must_use]
    pub fn local_store(&self) -> Option<LocalStore> {
        match &self.data_dir {
            Some(dir) => Some(LocalStore::new(dir.clone())),
            None => LocalStore::default_location(),
        }
    }
}

/// Command-line flags.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task manager for the terminal")]
pub struct CliArgs {
    /// Hosted project URL.
    #[arg(long, env = "TASKFLOW_URL")]
    pub url: Option<String>,

    /// Hosted project anon key.
    #[arg(long, env = "TASKFLOW_ANON_KEY")]
    pub anon_key: Option<String>,

    /// Public URL of the app, used in emailed links.
    #[arg(long, env = "TASKFLOW_SITE_URL")]
    pub site_url: Option<String>,

    /// Run against a seeded in-memory backend.
    #[arg(long)]
    pub offline: bool,

    /// Verification or password-reset link to open at startup.
    #[arg(long)]
    pub link: Option<String>,

    /// Settings file (must exist when given).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for prefs and the saved session.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `taskflow=debug`.
    #[arg(long, default_value = "info", env = "TASKFLOW_LOG")]
    pub log_level: String,

    /// Log destination (default `$TMPDIR/taskflow.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
