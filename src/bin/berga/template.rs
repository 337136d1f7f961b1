use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Subcommand};

use berga::Context;
use berga::catalog::{self, Catalog, Kind};
use berga::editor;
use berga::messages::Painter;
use berga::prompt;
use berga::runner::Platform;
use berga::template::{ApplyOutcome, TemplateApplier};

#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    command: TemplateCommand,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// List available templates
    #[command(visible_alias = "ls")]
    List,
    /// Apply a template to create a file
    Apply {
        /// Template name, with or without the `.tmpl` suffix
        name: String,
        /// File to create
        output: PathBuf,
    },
    /// Show template content
    Show {
        /// Template name, with or without the `.tmpl` suffix
        name: String,
    },
    /// Open a template in your configured editor
    Edit {
        /// Template name; new templates are created with the `.tmpl` suffix
        name: String,
    },
}

/// Dispatch a `template` subcommand.
///
/// # Errors
///
/// Returns an error if the template is missing, cannot be rendered, or IO fails.
pub fn run(args: TemplateArgs, ctx: &Context) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let dir = &ctx.paths.templates;
    match args.command {
        TemplateCommand::List => {
            Catalog::read(Kind::Template, dir)?.render(&mut std::io::stdout().lock())?;
        }
        TemplateCommand::Apply { name, output } => {
            let applier = TemplateApplier::new(dir, &ctx.settings, std::env::current_dir()?);
            let mut prompter = prompt::interactive();
            match applier.apply(&name, &output, prompter.as_mut())? {
                ApplyOutcome::Written { .. } => println!(
                    "{}",
                    Painter::stdout().success(&format!(
                        "Template '{name}' applied successfully to '{}'",
                        output.display()
                    ))
                ),
                ApplyOutcome::Cancelled => println!("Template application cancelled."),
            }
        }
        TemplateCommand::Show { name } => {
            let path = catalog::find_template(dir, &name)?;
            catalog::show(Kind::Template, &path, &mut std::io::stdout().lock())?;
        }
        TemplateCommand::Edit { name } => {
            let path = catalog::template_edit_path(dir, &name)?;
            let editor = editor::resolve_editor(
                &ctx.settings,
                |key| std::env::var(key).ok(),
                Platform::current(),
            );
            println!("Opening {} with {editor}...", path.display());
            std::fs::create_dir_all(dir)?;
            editor::open(&editor, &path)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
