//! Filesystem layout of the per-user berga directory
//!
//! ```text
//! ~/.berga/
//! ├── scripts/     # runnable scripts, flat
//! └── templates/   # text templates, flat, optional `.tmpl` suffix
//! ```
//!
//! Nothing here touches the disk. Directories are created by the operation
//! that needs them.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the configuration root under the home directory
pub const CONFIG_DIR_NAME: &str = ".berga";

#[derive(Error, Debug)]
pub enum PathsError {
    #[error("unable to determine the home directory for the current user")]
    ConfigUnavailable,
}

/// Resolved locations of the berga directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub root: PathBuf,
    pub scripts: PathBuf,
    pub templates: PathBuf,
}

impl ConfigPaths {
    /// Derive all paths from a home directory.
    #[must_use]
    pub fn from_home(home: &Path) -> Self {
        let root = home.join(CONFIG_DIR_NAME);
        Self {
            scripts: root.join("scripts"),
            templates: root.join("templates"),
            root,
        }
    }

    /// Resolve paths for the current user.
    ///
    /// # Errors
    ///
    /// Returns `PathsError::ConfigUnavailable` if the platform cannot report a home directory.
    pub fn for_current_user() -> Result<Self, PathsError> {
        dirs::home_dir()
            .map(|home| Self::from_home(&home))
            .ok_or(PathsError::ConfigUnavailable)
    }
}
