//! Listing and lookup of entries in the scripts and templates directories

use std::fmt;
use std::fs::Metadata;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use log::debug;
use thiserror::Error;

/// Suffix templates may carry on disk but not on the command line
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Which directory an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Script,
    Template,
}

impl Kind {
    fn plural(self) -> &'static str {
        match self {
            Kind::Script => "Scripts",
            Kind::Template => "Templates",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Script => f.write_str("script"),
            Kind::Template => f.write_str("template"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{kind} '{name}' not found in {}", dir.display())]
    NotFound {
        kind: Kind,
        name: String,
        dir: PathBuf,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file in a catalog directory, as seen at listing time
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Local>,
    pub executable: bool,
}

impl Entry {
    /// Name shown in listings; templates drop their `.tmpl` suffix.
    #[must_use]
    pub fn display_name(&self, kind: Kind) -> &str {
        match kind {
            Kind::Script => &self.name,
            Kind::Template => self
                .name
                .strip_suffix(TEMPLATE_SUFFIX)
                .unwrap_or(&self.name),
        }
    }
}

/// Contents of a scripts or templates directory
#[derive(Debug, Clone)]
pub struct Catalog {
    pub kind: Kind,
    pub dir: PathBuf,
    /// `false` when the directory does not exist; `entries` is then empty
    pub exists: bool,
    /// Regular files only, sorted by name
    pub entries: Vec<Entry>,
}

impl Catalog {
    /// Read the files of `dir`. Subdirectories are skipped, a missing directory is empty.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Read` if the directory exists but cannot be read.
    pub fn read(kind: Kind, dir: &Path) -> Result<Self, CatalogError> {
        let read_err = |source| CatalogError::Read {
            path: dir.to_path_buf(),
            source,
        };

        let iter = match std::fs::read_dir(dir) {
            Ok(iter) => iter,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} directory {} does not exist", kind, dir.display());
                return Ok(Self {
                    kind,
                    dir: dir.to_path_buf(),
                    exists: false,
                    entries: Vec::new(),
                });
            }
            Err(e) => return Err(read_err(e)),
        };

        let mut entries = Vec::new();
        for dir_entry in iter {
            let dir_entry = dir_entry.map_err(read_err)?;
            let path = dir_entry.path();
            let Ok(metadata) = std::fs::metadata(&path) else {
                debug!("Skipping unreadable entry {}", path.display());
                continue;
            };
            if metadata.is_dir() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                debug!("Skipping {} without a modification time", path.display());
                continue;
            };
            entries.push(Entry {
                name: dir_entry.file_name().to_string_lossy().into_owned(),
                executable: is_executable(&path, &metadata),
                size_bytes: metadata.len(),
                modified_at: modified.into(),
                path,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            kind,
            dir: dir.to_path_buf(),
            exists: true,
            entries,
        })
    }

    /// Write the human-readable listing.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let plural = self.kind.plural();
        if !self.exists {
            writeln!(
                out,
                "{plural} directory does not exist: {}",
                self.dir.display()
            )?;
            writeln!(
                out,
                "Create it and add {} to get started.",
                plural.to_lowercase()
            )?;
            return Ok(());
        }

        if self.entries.is_empty() {
            writeln!(out, "No {} found.", plural.to_lowercase())?;
            writeln!(out, "Add {} to: {}", plural.to_lowercase(), self.dir.display())?;
            return Ok(());
        }

        let title = format!("Available {plural}:");
        writeln!(out, "{title}")?;
        writeln!(out, "{}", "=".repeat(title.chars().count()))?;
        for entry in &self.entries {
            let icon = match (self.kind, entry.executable) {
                (Kind::Template, _) => "📋",
                (Kind::Script, true) => "🚀",
                (Kind::Script, false) => "📄",
            };
            writeln!(
                out,
                "  {icon} {} ({}, {})",
                entry.display_name(self.kind),
                humanize_size(entry.size_bytes),
                entry.modified_at.format("%Y-%m-%d %H:%M")
            )?;
        }
        writeln!(out)?;
        writeln!(out, "{plural} directory: {}", self.dir.display())
    }
}

/// `true` if `name` is a single plain file name, with no separators or `..`.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn not_found(kind: Kind, name: &str, dir: &Path) -> CatalogError {
    CatalogError::NotFound {
        kind,
        name: name.to_string(),
        dir: dir.to_path_buf(),
    }
}

/// Locate a script by its exact file name.
///
/// # Errors
///
/// Returns `CatalogError::NotFound` if no regular file of that name exists.
pub fn find_script(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    let path = dir.join(name);
    if is_plain_name(name) && path.is_file() {
        Ok(path)
    } else {
        Err(not_found(Kind::Script, name, dir))
    }
}

/// Locate a template by exact name, then with the `.tmpl` suffix.
///
/// # Errors
///
/// Returns `CatalogError::NotFound` if neither file exists.
pub fn find_template(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    if is_plain_name(name) {
        for candidate in [name.to_string(), format!("{name}{TEMPLATE_SUFFIX}")] {
            let path = dir.join(candidate);
            if path.is_file() {
                return Ok(path);
            }
        }
    }
    Err(not_found(Kind::Template, name, dir))
}

/// Path to open for editing a template; new templates get the `.tmpl` suffix.
///
/// # Errors
///
/// Returns `CatalogError::NotFound` if `name` is not a plain file name.
pub fn template_edit_path(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    match find_template(dir, name) {
        Ok(path) => Ok(path),
        Err(_) if is_plain_name(name) => Ok(dir.join(format!("{name}{TEMPLATE_SUFFIX}"))),
        Err(e) => Err(e),
    }
}

/// Path to open for editing a script. The file does not need to exist.
///
/// # Errors
///
/// Returns `CatalogError::NotFound` if `name` is not a plain file name.
pub fn script_edit_path(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    if is_plain_name(name) {
        Ok(dir.join(name))
    } else {
        Err(not_found(Kind::Script, name, dir))
    }
}

/// Print a file with a `Script: <path>` / `Template: <path>` header.
///
/// # Errors
///
/// Returns `CatalogError::Read` if the file cannot be read or written out.
pub fn show(kind: Kind, path: &Path, out: &mut impl Write) -> Result<(), CatalogError> {
    let read_err = |source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    };
    let content = std::fs::read(path).map_err(read_err)?;
    let header = match kind {
        Kind::Script => "Script",
        Kind::Template => "Template",
    };
    let shown = path.display().to_string();
    writeln!(out, "{header}: {shown}").map_err(read_err)?;
    writeln!(out, "{}", "=".repeat(shown.chars().count() + header.len() + 3))
        .map_err(read_err)?;
    out.write_all(&content).map_err(read_err)
}

/// Whether a file looks runnable on this platform: the execute bit on unix,
/// a known executable extension on Windows.
#[must_use]
pub fn is_executable(path: &Path, metadata: &Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = path;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ["exe", "bat", "cmd", "ps1"]
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

/// Format a byte count as `B`, `KB` or `MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn humanize_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if size < KB {
        format!("{size} B")
    } else if size < MB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else {
        format!("{:.1} MB", size as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(name: &str, size_bytes: u64, executable: bool) -> Entry {
        Entry {
            name: name.to_string(),
            path: PathBuf::from("/home/u/.berga/scripts").join(name),
            size_bytes,
            modified_at: Local.with_ymd_and_hms(2024, 1, 2, 15, 4, 0).unwrap(),
            executable,
        }
    }

    fn rendered(catalog: &Catalog) -> String {
        let mut out = Vec::new();
        catalog.render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_humanize_size() {
        assert_eq!(humanize_size(0), "0 B");
        assert_eq!(humanize_size(1023), "1023 B");
        assert_eq!(humanize_size(1024), "1.0 KB");
        assert_eq!(humanize_size(1536), "1.5 KB");
        assert_eq!(humanize_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_read_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("scripts");
        let catalog = Catalog::read(Kind::Script, &missing).unwrap();
        assert!(!catalog.exists);
        assert!(catalog.entries.is_empty());
    }

    #[test]
    fn test_read_sorts_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zeta.sh"), "echo z").unwrap();
        std::fs::write(dir.path().join("alpha.sh"), "echo a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("inner.sh"), "").unwrap();

        let catalog = Catalog::read(Kind::Script, dir.path()).unwrap();
        let names: Vec<&str> = catalog.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.sh", "zeta.sh"]);
        assert_eq!(catalog.entries[0].size_bytes, 6);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_reports_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("run.sh");
        std::fs::write(&exec, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exec, std::fs::Permissions::from_mode(0o755)).unwrap();
        let plain = dir.path().join("plain.sh");
        std::fs::write(&plain, "echo\n").unwrap();
        std::fs::set_permissions(&plain, std::fs::Permissions::from_mode(0o644)).unwrap();

        let catalog = Catalog::read(Kind::Script, dir.path()).unwrap();
        let flags: Vec<(&str, bool)> = catalog
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.executable))
            .collect();
        assert_eq!(flags, vec![("plain.sh", false), ("run.sh", true)]);
    }

    #[test]
    fn test_render_scripts() {
        let catalog = Catalog {
            kind: Kind::Script,
            dir: PathBuf::from("/home/u/.berga/scripts"),
            exists: true,
            entries: vec![entry("deploy.sh", 1229, true), entry("notes.txt", 12, false)],
        };
        insta::assert_snapshot!(rendered(&catalog), @r"
        Available Scripts:
        ==================
          🚀 deploy.sh (1.2 KB, 2024-01-02 15:04)
          📄 notes.txt (12 B, 2024-01-02 15:04)

        Scripts directory: /home/u/.berga/scripts
        ");
    }

    #[test]
    fn test_render_templates_strips_suffix() {
        let catalog = Catalog {
            kind: Kind::Template,
            dir: PathBuf::from("/home/u/.berga/templates"),
            exists: true,
            entries: vec![entry("readme.md.tmpl", 40, false)],
        };
        insta::assert_snapshot!(rendered(&catalog), @r"
        Available Templates:
        ====================
          📋 readme.md (40 B, 2024-01-02 15:04)

        Templates directory: /home/u/.berga/templates
        ");
    }

    #[test]
    fn test_render_empty_and_missing() {
        let mut catalog = Catalog {
            kind: Kind::Script,
            dir: PathBuf::from("/home/u/.berga/scripts"),
            exists: true,
            entries: Vec::new(),
        };
        assert_eq!(
            rendered(&catalog),
            "No scripts found.\nAdd scripts to: /home/u/.berga/scripts\n"
        );

        catalog.exists = false;
        assert!(
            rendered(&catalog)
                .starts_with("Scripts directory does not exist: /home/u/.berga/scripts\n")
        );
    }

    #[test]
    fn test_find_script_exact_name_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.sh"), "").unwrap();
        assert_eq!(
            find_script(dir.path(), "deploy.sh").unwrap(),
            dir.path().join("deploy.sh")
        );
        assert!(matches!(
            find_script(dir.path(), "deploy"),
            Err(CatalogError::NotFound { kind: Kind::Script, .. })
        ));
    }

    #[test]
    fn test_find_script_rejects_paths_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("x.sh"), "").unwrap();
        assert!(find_script(dir.path(), "sub").is_err());
        assert!(find_script(dir.path(), "sub/x.sh").is_err());
        assert!(find_script(dir.path(), "../x.sh").is_err());
    }

    #[test]
    fn test_not_found_message_names_directory() {
        let err = find_script(Path::new("/nowhere/scripts"), "ghost.sh").unwrap_err();
        assert_eq!(
            err.to_string(),
            "script 'ghost.sh' not found in /nowhere/scripts"
        );
    }

    #[test]
    fn test_find_template_falls_back_to_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md.tmpl"), "").unwrap();
        assert_eq!(
            find_template(dir.path(), "readme.md").unwrap(),
            dir.path().join("readme.md.tmpl")
        );
        assert_eq!(
            find_template(dir.path(), "readme.md.tmpl").unwrap(),
            dir.path().join("readme.md.tmpl")
        );
        assert!(find_template(dir.path(), "missing-template").is_err());
    }

    #[test]
    fn test_template_edit_path_for_new_template() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            template_edit_path(dir.path(), "fresh").unwrap(),
            dir.path().join("fresh.tmpl")
        );
        std::fs::write(dir.path().join("plain"), "").unwrap();
        assert_eq!(
            template_edit_path(dir.path(), "plain").unwrap(),
            dir.path().join("plain")
        );
    }

    #[test]
    fn test_show_writes_header_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.sh");
        std::fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();

        let mut out = Vec::new();
        show(Kind::Script, &path, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let shown = path.display().to_string();
        let expected = format!(
            "Script: {shown}\n{}\n#!/bin/sh\necho hi\n",
            "=".repeat(shown.len() + 9)
        );
        assert_eq!(out, expected);
    }
}
