mod script;
mod template;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use berga::Context;

#[derive(Parser, Debug)]
#[command(
    name = "berga",
    version,
    about = "A personal CLI utility for managing scripts and configs",
    long_about = "Berga helps you manage and execute your personal scripts, configurations, \
and automation tasks.\n\nScripts live in ~/.berga/scripts and templates in ~/.berga/templates."
)]
struct Cli {
    /// Config file (default is $HOME/.berga.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log file path (log records are also written to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage and execute scripts
    #[command(visible_alias = "s")]
    Script(script::ScriptArgs),
    /// Manage and use templates
    #[command(visible_aliases = ["tmpl", "t"])]
    Template(template::TemplateArgs),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()?;
    berga::logger::init(cli.verbose, log_file);

    let ctx = Context::load(cli.config.as_deref(), cli.verbose)?;
    if ctx.verbose
        && let Some(source) = ctx.settings.source()
    {
        eprintln!("Using config file: {}", source.display());
    }

    match cli.command {
        Commands::Script(args) => script::run(args, &ctx).await,
        Commands::Template(args) => template::run(args, &ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_timeout_before_script_args() {
        let cli = Cli::try_parse_from([
            "berga", "script", "run", "loop.sh", "--timeout", "1", "--", "-x", "arg",
        ])
        .unwrap();
        let Commands::Script(args) = cli.command else {
            panic!("expected script command");
        };
        let (name, timeout, rest) = args.run_parts().unwrap();
        assert_eq!(name, "loop.sh");
        assert_eq!(timeout, Some(1));
        assert_eq!(rest, ["-x", "arg"]);
    }

    #[test]
    fn test_run_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["berga", "script", "run", "x", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_aliases() {
        assert!(Cli::try_parse_from(["berga", "s", "ls"]).is_ok());
        assert!(Cli::try_parse_from(["berga", "tmpl", "list"]).is_ok());
        assert!(Cli::try_parse_from(["berga", "t", "apply", "readme.md", "out.md"]).is_ok());
    }
}
