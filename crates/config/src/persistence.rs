//! Reading and writing JSON5/JSON documents.
//!
//! Provider configuration and the record files handled by the command-line
//! host share the same on-disk conventions:
//!
//! - Reading accepts JSON5 (comments, trailing commas, unquoted keys) and
//!   therefore plain JSON too.
//! - Writing produces pretty-printed JSON, creating parent directories.
//!
//! # Configuration search order
//!
//! 1. `$HUBFORM_CONFIG`, if set
//! 2. `./hubform.json5`, `./hubform.json`
//! 3. `~/.config/hubform/config.json5`, `~/.config/hubform/config.json`

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "HUBFORM_CONFIG";

/// File names searched for in the working directory, in priority order.
const LOCAL_FILE_NAMES: &[&str] = &["hubform.json5", "hubform.json"];

/// Directory under the platform config dir holding the user configuration.
const USER_CONFIG_DIR: &str = "hubform";

/// File names searched for in the user configuration directory.
const USER_FILE_NAMES: &[&str] = &["config.json5", "config.json"];

/// Finds the configuration file to load, if any.
///
/// An explicit `$HUBFORM_CONFIG` path is returned even if it does not exist,
/// so that loading it reports a clear error instead of silently falling back.
///
/// # Examples
///
/// ```no_run
/// use hubform_config::persistence::find_config_file;
///
/// if let Some(path) = find_config_file() {
///     println!("Found config at: {}", path.display());
/// }
/// ```
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }

    find_in(Path::new("."), LOCAL_FILE_NAMES)
        .or_else(|| user_config_dir().ok().and_then(|dir| find_in(&dir, USER_FILE_NAMES)))
}

/// Returns the first of `names` that exists under `dir`.
fn find_in(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Returns the user configuration directory (`~/.config/hubform/` on Unix).
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(USER_CONFIG_DIR))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Reads and parses a JSON5 or JSON document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed into `T`.
///
/// # Examples
///
/// ```no_run
/// use hubform_config::persistence::read_json_file;
/// use hubform_config::Config;
///
/// # fn main() -> hubform_config::Result<()> {
/// let config: Config = read_json_file("hubform.json5")?;
/// # Ok(())
/// # }
/// ```
pub fn read_json_file<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading document");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json5::from_str(&content).map_err(ConfigError::from)
}

/// Writes a value as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written, or the
/// value cannot be serialized.
pub fn write_json_file<T: serde::Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let write_err = |source| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    debug!(path = %path.display(), "writing document");
    std::fs::write(path, content).map_err(write_err)
}
