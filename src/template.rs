//! Applying templates: variable collection and Go `text/template` rendering

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use gtmpl::{Context, Value};
use log::debug;
use thiserror::Error;

use crate::catalog::{self, CatalogError};
use crate::prompt::{PromptError, Prompter};
use crate::settings::Settings;

/// Rendered in place of a variable that was never collected
pub const NO_VALUE: &str = "<no value>";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    NotFound(#[from] CatalogError),
    #[error("failed to parse template '{name}': {message}")]
    Parse { name: String, message: String },
    #[error("failed to render template '{name}': {message}")]
    Render { name: String, message: String },
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Variables available to a template
pub type Variables = BTreeMap<String, String>;

/// A parsed template, written in Go `text/template` syntax (`{{.ProjectName}}`)
pub struct Template {
    name: String,
    inner: gtmpl::Template,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Template {
    /// Parse template text.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Parse` for malformed actions or unclosed blocks.
    pub fn parse(name: &str, source: String) -> Result<Self, TemplateError> {
        let mut inner = gtmpl::Template::default();
        inner.parse(source).map_err(|e| TemplateError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    /// Render with `vars` as the dot value. Unknown names render as [`NO_VALUE`].
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if evaluation fails, e.g. a bad function call.
    pub fn render(&self, vars: &Variables) -> Result<String, TemplateError> {
        let data = Value::Map(
            vars.iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
        );
        self.inner
            .render(&Context::from(data))
            .map_err(|e| TemplateError::Render {
                name: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Gather template variables from settings, the working directory and the user.
///
/// `ProjectName` and `Author` are asked for only when no default exists.
/// Further `key=value` pairs are read until an empty line or end of input;
/// lines without `=` are ignored.
///
/// # Errors
///
/// Returns `PromptError` if a prompt fails.
pub fn collect_variables(
    settings: &Settings,
    cwd: &Path,
    prompter: &mut dyn Prompter,
) -> Result<Variables, PromptError> {
    let mut vars = Variables::new();
    vars.insert(
        "Author".into(),
        settings.get_string("templates.author").unwrap_or_default(),
    );
    vars.insert(
        "Email".into(),
        settings.get_string("templates.email").unwrap_or_default(),
    );
    if let Some(base) = cwd.file_name() {
        let base = base.to_string_lossy().into_owned();
        vars.insert("CurrentDir".into(), base.clone());
        vars.insert("ProjectName".into(), base);
    }

    prompter.say("Template Variables:")?;
    prompter.say("==================")?;

    for (key, label, placeholder) in [
        ("ProjectName", "Project Name", Some(".")),
        ("Author", "Author", None),
    ] {
        let current = vars.get(key).map(String::as_str).unwrap_or_default();
        if current.is_empty() || placeholder == Some(current) {
            if let Some(answer) = prompter.input(&format!("{label}:"))?
                && !answer.trim().is_empty()
            {
                vars.insert(key.into(), answer.trim().to_string());
            }
        } else {
            prompter.say(&format!("{label}: {current}"))?;
        }
    }

    loop {
        let Some(line) = prompter.input("Additional variables (key=value, empty to finish):")?
        else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                vars.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => debug!("Ignoring malformed variable entry '{line}'"),
        }
    }

    Ok(vars)
}

/// Result of [`TemplateApplier::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Written { template: PathBuf, dest: PathBuf },
    /// The destination existed and the user declined to overwrite it
    Cancelled,
}

/// Renders templates from the templates directory into destination files
#[derive(Debug, Clone)]
pub struct TemplateApplier<'a> {
    templates_dir: &'a Path,
    settings: &'a Settings,
    cwd: PathBuf,
}

impl<'a> TemplateApplier<'a> {
    #[must_use]
    pub fn new(templates_dir: &'a Path, settings: &'a Settings, cwd: PathBuf) -> Self {
        Self {
            templates_dir,
            settings,
            cwd,
        }
    }

    /// Apply template `name` to `dest`.
    ///
    /// Nothing is written unless the template resolves, parses, and the user
    /// agrees to overwrite an existing destination.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::NotFound` if neither `name` nor `name.tmpl` exists,
    /// or a read, parse, prompt, or write error.
    pub fn apply(
        &self,
        name: &str,
        dest: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<ApplyOutcome, TemplateError> {
        let template_path = catalog::find_template(self.templates_dir, name)?;

        if dest.exists()
            && !prompter.confirm(&format!(
                "File {} already exists. Overwrite?",
                dest.display()
            ))?
        {
            debug!("Not overwriting {}", dest.display());
            return Ok(ApplyOutcome::Cancelled);
        }

        let source =
            std::fs::read_to_string(&template_path).map_err(|source| TemplateError::Read {
                path: template_path.clone(),
                source,
            })?;
        let template = Template::parse(name, source)?;

        let vars = collect_variables(self.settings, &self.cwd, prompter)?;
        let rendered = template.render(&vars)?;
        debug!("Rendered template '{name}' into {} bytes", rendered.len());
        std::fs::write(dest, rendered).map_err(|source| TemplateError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

        Ok(ApplyOutcome::Written {
            template: template_path,
            dest: dest.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::LinePrompter;
    use std::io::Cursor;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn lines(input: &str) -> LinePrompter<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_render_fields() {
        let template = Template::parse(
            "readme",
            "# {{.ProjectName}}\nby {{ .Author }} <{{.Email}}>\n".to_string(),
        )
        .unwrap();
        let out = template
            .render(&vars(&[("ProjectName", "Foo"), ("Author", "Jane")]))
            .unwrap();
        assert_eq!(out, format!("# Foo\nby Jane <{NO_VALUE}>\n"));
    }

    #[test]
    fn test_render_plain_text() {
        let template = Template::parse("plain", "no placeholders here".to_string()).unwrap();
        assert_eq!(
            template.render(&Variables::new()).unwrap(),
            "no placeholders here"
        );
    }

    #[test]
    fn test_render_comments_trim_markers_and_conditionals() {
        let template = Template::parse(
            "header",
            "{{/* header */}}{{- .ProjectName -}}\n{{if .Author}} by {{.Author}}{{end}}"
                .to_string(),
        )
        .unwrap();
        assert_eq!(
            template
                .render(&vars(&[("ProjectName", "Foo"), ("Author", "Jane")]))
                .unwrap(),
            "Foo by Jane"
        );
        assert_eq!(
            template
                .render(&vars(&[("ProjectName", "Foo"), ("Author", "")]))
                .unwrap(),
            "Foo"
        );
    }

    #[test]
    fn test_parse_rejects_malformed_templates() {
        for source in ["line one\n{{.Name", "{{range .Items}}"] {
            match Template::parse("t", source.to_string()) {
                Err(TemplateError::Parse { name, .. }) => assert_eq!(name, "t"),
                other => panic!("Expected Parse error for {source:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_collect_uses_defaults_without_prompting() {
        let settings =
            Settings::from_yaml_str("templates:\n  author: Jane\n  email: jane@example.com\n")
                .unwrap();
        let mut prompter = lines("\n");
        let vars = collect_variables(&settings, Path::new("/work/myproj"), &mut prompter).unwrap();
        assert_eq!(vars["ProjectName"], "myproj");
        assert_eq!(vars["CurrentDir"], "myproj");
        assert_eq!(vars["Author"], "Jane");
        assert_eq!(vars["Email"], "jane@example.com");

        let shown = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(shown.contains("Project Name: myproj\n"));
        assert!(shown.contains("Author: Jane\n"));
    }

    #[test]
    fn test_collect_prompts_for_missing_and_extra_values() {
        let mut prompter =
            lines("Ann\nlicense = MIT\nnot-a-pair\n=orphan\nProjectName=Bar\n\nignored=1\n");
        let vars = collect_variables(
            &Settings::default(),
            Path::new("/work/myproj"),
            &mut prompter,
        )
        .unwrap();
        assert_eq!(vars["Author"], "Ann");
        assert_eq!(vars["license"], "MIT");
        assert_eq!(vars["ProjectName"], "Bar");
        assert!(!vars.contains_key("not-a-pair"));
        assert!(!vars.contains_key(""));
        assert!(!vars.contains_key("ignored"));
    }

    #[test]
    fn test_collect_prompts_for_project_name_at_root() {
        let mut prompter = lines("Rooted\nAnn\n");
        let vars = collect_variables(&Settings::default(), Path::new("/"), &mut prompter).unwrap();
        assert_eq!(vars["ProjectName"], "Rooted");
        assert_eq!(vars["Author"], "Ann");
    }

    #[test]
    fn test_apply_missing_template_leaves_dest_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.txt");
        let settings = Settings::default();
        let applier = TemplateApplier::new(dir.path(), &settings, dir.path().to_path_buf());
        let err = applier
            .apply("missing-template", &dest, &mut lines(""))
            .unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_apply_parse_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.tmpl"), "{{range .Items}}").unwrap();
        let dest = dir.path().join("out.txt");
        let settings = Settings::default();
        let applier = TemplateApplier::new(dir.path(), &settings, dir.path().to_path_buf());
        let err = applier.apply("bad", &dest, &mut lines("")).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
        assert!(!dest.exists());
    }
}
