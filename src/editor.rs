use std::path::Path;
use std::process::{Command as ProcessCommand, ExitStatus};

use log::debug;
use thiserror::Error;

use crate::runner::Platform;
use crate::settings::Settings;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("editor command is empty")]
    Empty,
    #[error("failed to start editor '{editor}': {source}")]
    Spawn {
        editor: String,
        #[source]
        source: std::io::Error,
    },
    #[error("editor '{editor}' exited with {status}")]
    Exit { editor: String, status: ExitStatus },
}

/// Pick the editor: `editor` setting, then `$EDITOR`, then `$VISUAL`, then a platform default.
#[must_use]
pub fn resolve_editor(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
    platform: Platform,
) -> String {
    settings
        .get_string("editor")
        .into_iter()
        .chain(env("EDITOR"))
        .chain(env("VISUAL"))
        .find(|editor| !editor.trim().is_empty())
        .unwrap_or_else(|| match platform {
            Platform::Windows => "notepad".to_string(),
            Platform::Posix => "nano".to_string(),
        })
}

/// Split an editor setting into program and arguments.
///
/// A value naming an existing file is used whole, so paths with spaces work.
/// Otherwise it is split on whitespace (`code --wait`).
fn editor_command(editor: &str) -> Option<(String, Vec<String>)> {
    let trimmed = editor.trim();
    if Path::new(trimmed).is_file() {
        return Some((trimmed.to_string(), Vec::new()));
    }
    let mut parts = trimmed.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Open `path` in `editor` and wait for it to exit.
///
/// The editor string may carry arguments, e.g. `code --wait`.
///
/// # Errors
///
/// Returns `EditorError::Spawn` if the editor cannot be started, or
/// `EditorError::Exit` if it exits unsuccessfully.
pub fn open(editor: &str, path: &Path) -> Result<(), EditorError> {
    let (program, args) = editor_command(editor).ok_or(EditorError::Empty)?;
    debug!("Launching editor {editor} on {}", path.display());

    let status = ProcessCommand::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|source| EditorError::Spawn {
            editor: editor.to_string(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(EditorError::Exit {
            editor: editor.to_string(),
            status,
        })
    }
}
