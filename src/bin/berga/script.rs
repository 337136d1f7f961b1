use std::process::ExitCode;

use clap::{Args, Subcommand};

use berga::Context;
use berga::catalog::{self, Catalog, Kind};
use berga::editor;
use berga::messages::Painter;
use berga::runner::{self, Platform, RunOutcome, RunRequest};

#[derive(Args, Debug)]
pub struct ScriptArgs {
    #[command(subcommand)]
    command: ScriptCommand,
}

#[derive(Subcommand, Debug)]
enum ScriptCommand {
    /// List available scripts
    #[command(visible_alias = "ls")]
    List,
    /// Execute a script
    Run(RunArgs),
    /// Open a script in your configured editor
    Edit {
        /// Script file name
        name: String,
    },
    /// Show script content
    Show {
        /// Script file name
        name: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Script file name in the scripts directory
    name: String,

    /// Execution timeout in seconds [default: `scripts.timeout` setting, else 300]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Arguments passed to the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[cfg(test)]
impl ScriptArgs {
    pub fn run_parts(&self) -> Option<(&str, Option<u64>, &[String])> {
        match &self.command {
            ScriptCommand::Run(run) => {
                Some((run.name.as_str(), run.timeout, run.args.as_slice()))
            }
            _ => None,
        }
    }
}

/// Dispatch a `script` subcommand.
///
/// # Errors
///
/// Returns an error if the script is missing, fails, times out, or IO fails.
pub async fn run(
    args: ScriptArgs,
    ctx: &Context,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let dir = &ctx.paths.scripts;
    match args.command {
        ScriptCommand::List => {
            Catalog::read(Kind::Script, dir)?.render(&mut std::io::stdout().lock())?;
        }
        ScriptCommand::Run(run_args) => run_script(run_args, ctx).await?,
        ScriptCommand::Edit { name } => {
            let path = catalog::script_edit_path(dir, &name)?;
            let editor = editor::resolve_editor(
                &ctx.settings,
                |key| std::env::var(key).ok(),
                Platform::current(),
            );
            println!("Opening {} with {editor}...", path.display());
            editor::open(&editor, &path)?;
        }
        ScriptCommand::Show { name } => {
            let path = catalog::find_script(dir, &name)?;
            catalog::show(Kind::Script, &path, &mut std::io::stdout().lock())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_script(args: RunArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let request = RunRequest {
        timeout: RunRequest::timeout_from(args.timeout, &ctx.settings),
        script_name: args.name,
        arguments: args.args,
    };
    let plan = runner::resolve(&ctx.paths.scripts, &request.script_name)?;

    let verbose = ctx.verbose_scripts();
    let painter = Painter::stdout();
    if verbose {
        let command_line = format!(
            "Executing: {} {}",
            plan.script.display(),
            request.arguments.join(" ")
        );
        println!("{}", painter.arrow(command_line.trim_end()));
        println!("{}", painter.dim(&format!("Timeout: {:?}", request.timeout)));
        println!("--- Output ---");
    }

    let outcome = runner::run(&plan, &request.arguments, request.timeout).await;
    match &outcome {
        RunOutcome::Success if verbose => {
            println!(
                "{}",
                painter.success("--- Script completed successfully ---")
            );
        }
        RunOutcome::TimedOut { .. } => {
            eprintln!(
                "{}",
                Painter::stderr().failure(&format!("{} was killed", request.script_name))
            );
        }
        _ => {}
    }
    outcome.into_result()?;
    Ok(())
}
