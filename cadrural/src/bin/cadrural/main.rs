mod commands;
mod help;
mod output;
mod style;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cadrural::AppConfig;
use clap::{FromArgMatches, Parser, Subcommand, error::ErrorKind};
use log::debug;

use commands::{
    dashboard::handle_dashboard,
    normalize::{NormalizeArgs, handle_normalize},
    seed::handle_seed,
    serve::{ServeArgs, handle_serve},
};
use output::{GlobalOptions, OutputFormat, OutputManager};

#[derive(Parser)]
#[command(name = "cadrural")]
#[command(version)]
#[command(
    about = "Rural producer registry: JSON API, demo data and dashboard figures",
    long_about = r#"Rural producer registry that provides:

• CRUD and filtered, paged listings for producers, properties, production units and herds
• Accent-insensitive search and digit-only matching for CPF/CNPJ and phone numbers
• Dashboard figures and consolidated reports
• Document upload and download
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
pub(crate) struct Cli {
    /// Config file (default: cadrural.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API with the configured store
    Serve(ServeArgs),

    /// Print the normalized form and tokens of a text
    Normalize(NormalizeArgs),

    /// Insert a small deterministic demo data set
    Seed,

    /// Print dashboard totals and the 12-month evolution
    Dashboard,
}

/// Parses arguments with the styled help; help, version and usage errors exit here.
fn parse_cli() -> Cli {
    let parsed = help::command()
        .try_get_matches()
        .and_then(|matches| Cli::from_arg_matches(&matches));
    match parsed {
        Ok(cli) => cli,
        Err(err) => {
            let padded = !matches!(err.kind(), ErrorKind::DisplayVersion);
            if padded {
                eprintln!();
            }
            let _ = err.print();
            if padded {
                eprintln!();
            }
            std::process::exit(err.exit_code());
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug and `--quiet` means error.
fn init_logging(cli: &Cli) {
    let default_level = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = parse_cli();
    init_logging(&cli);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output).await {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).context("Failed to load configuration")?;
    debug!("configuration: {config:?}");
    Ok(config)
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => handle_serve(args, &load_config(config_path)?, output).await,
        Commands::Normalize(args) => handle_normalize(args, output),
        Commands::Seed => handle_seed(&load_config(config_path)?, output).await,
        Commands::Dashboard => handle_dashboard(&load_config(config_path)?, output).await,
    }
}
