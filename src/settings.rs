//! Read-only settings merged from `~/.berga.yaml` and `BERGA_*` environment variables

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::Value;
use thiserror::Error;

/// Errors that can occur while loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unable to read config file {path}: {source}")]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse YAML config file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
}

/// Config file name, searched in the home directory and then the working directory
pub const FILENAME: &str = ".berga.yaml";

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "BERGA_";

/// A single scalar setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    String(String),
    Bool(bool),
    Int(i64),
}

/// Merged view over the config file and the environment.
///
/// The environment is captured once, so lookups are pure and tests can inject
/// their own variables with [`Settings::with_env`].
#[derive(Debug, Clone, Default)]
pub struct Settings {
    file: Value,
    env: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_yaml::Error` if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self {
            file: serde_yaml::from_str(contents)?,
            ..Self::default()
        })
    }

    /// Load and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Read` if the file cannot be read, or
    /// `SettingsError::Yaml` if parsing fails.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            source: e,
            path: path.to_path_buf(),
        })?;
        let mut settings = Self::from_yaml_str(&contents).map_err(|e| SettingsError::Yaml {
            source: e,
            path: path.to_path_buf(),
        })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Find the config file: home directory first, then the working directory.
    #[must_use]
    pub fn find_config(home: Option<&Path>, cwd: Option<&Path>) -> Option<PathBuf> {
        [home, cwd]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(FILENAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load settings for this invocation.
    ///
    /// An explicit path must exist. Without one, a missing config file simply
    /// yields empty settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::ConfigNotFound` if `explicit` does not exist, or
    /// any error from [`Settings::from_file`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(SettingsError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config(
                dirs::home_dir().as_deref(),
                std::env::current_dir().ok().as_deref(),
            ),
        };

        let settings = match path {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        let env = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        Ok(settings.with_env(env))
    }

    /// Replace the captured environment.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// The config file these settings were read from, if any
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Environment variable name for a dotted key: `scripts.timeout` → `BERGA_SCRIPTS_TIMEOUT`.
    #[must_use]
    pub fn env_key(key: &str) -> String {
        format!("{ENV_PREFIX}{}", key.replace('.', "_").to_uppercase())
    }

    /// Look up a dotted key. The environment wins over the file.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Setting> {
        if let Some(value) = self.env.get(&Self::env_key(key)) {
            return Some(Setting::String(value.clone()));
        }

        let mut node = &self.file;
        for segment in key.split('.') {
            node = child(node, segment)?;
        }
        match node {
            Value::String(s) => Some(Setting::String(s.clone())),
            Value::Bool(b) => Some(Setting::Bool(*b)),
            Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Setting::String(n.to_string()), Setting::Int),
            ),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|setting| match setting {
            Setting::String(s) => s,
            Setting::Bool(b) => b.to_string(),
            Setting::Int(i) => i.to_string(),
        })
    }

    /// Boolean lookup; absent or unparsable values are `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Setting::Bool(b)) => b,
            Some(Setting::Int(i)) => i != 0,
            Some(Setting::String(s)) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            None => false,
        }
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Setting::Int(i) => Some(i),
            Setting::Bool(b) => Some(i64::from(b)),
            Setting::String(s) => s.trim().parse().ok(),
        }
    }
}

/// Case-insensitive mapping lookup, matching how keys are written on the command line.
fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    node.as_mapping()?.iter().find_map(|(key, value)| {
        key.as_str()
            .filter(|key| key.eq_ignore_ascii_case(segment))
            .map(|_| value)
    })
}
