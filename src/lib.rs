//! Core implementation of berga
//!
//! Berga keeps personal scripts and configuration templates under `~/.berga/`
//! and lists, shows, edits, runs, or applies them. Scripts are launched with an
//! interpreter picked from their extension, execute bit, or shebang line, and
//! are killed when they outlive their timeout.

use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::paths::{ConfigPaths, PathsError};
use crate::settings::{Settings, SettingsError};

pub mod catalog;
pub mod editor;
pub mod logger;
pub mod messages;
pub mod paths;
pub mod prompt;
pub mod runner;
pub mod settings;
pub mod template;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Paths(#[from] PathsError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Everything a command needs: where files live, settings, and verbosity
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: ConfigPaths,
    pub settings: Settings,
    pub verbose: bool,
}

impl Context {
    /// Build a context from explicit parts.
    #[must_use]
    pub fn new(paths: ConfigPaths, settings: Settings, verbose_flag: bool) -> Self {
        let verbose = verbose_flag || settings.get_bool("verbose");
        Self {
            paths,
            settings,
            verbose,
        }
    }

    /// Resolve the current user's directories and load settings.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Paths` if the home directory is unknown, or
    /// `ContextError::Settings` if the config file cannot be loaded.
    pub fn load(config_file: Option<&Path>, verbose_flag: bool) -> Result<Self, ContextError> {
        let paths = ConfigPaths::for_current_user()?;
        let settings = Settings::load(config_file)?;
        debug!("Using berga directory {}", paths.root.display());
        Ok(Self::new(paths, settings, verbose_flag))
    }

    /// Whether script runs print the execution banner
    #[must_use]
    pub fn verbose_scripts(&self) -> bool {
        self.verbose || self.settings.get_bool("scripts.verbose")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_from_flag_or_settings() {
        let paths = ConfigPaths::from_home(Path::new("/home/u"));

        let ctx = Context::new(paths.clone(), Settings::default(), false);
        assert!(!ctx.verbose);
        assert!(!ctx.verbose_scripts());

        let ctx = Context::new(paths.clone(), Settings::default(), true);
        assert!(ctx.verbose && ctx.verbose_scripts());

        let settings = Settings::from_yaml_str("scripts:\n  verbose: true\n").unwrap();
        let ctx = Context::new(paths.clone(), settings, false);
        assert!(!ctx.verbose);
        assert!(ctx.verbose_scripts());

        let settings = Settings::from_yaml_str("verbose: true\n").unwrap();
        assert!(Context::new(paths, settings, false).verbose);
    }
}
