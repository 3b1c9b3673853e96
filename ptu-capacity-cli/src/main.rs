//! ptu-capacity CLI - Command-line interface
//!
//! Exports Azure OpenAI provisioned throughput capacity as a CSV matrix and
//! shows the stored result.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ptu_capacity::config::ConfigFile;
use ptu_capacity::logging::{init_logging, LoggingConfig};
use tracing::error;

use commands::config::ConfigCommands;
use commands::export::ExportArgs;
use commands::init::InitArgs;
use commands::show::ShowArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "ptu-capacity")]
#[command(version, about = "Azure OpenAI PTU capacity export", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover PTU capacity and store the CSV matrix
    Export(ExportArgs),

    /// Display the stored capacity matrix
    Show(ShowArgs),

    /// Create or update the configuration file
    Init(InitArgs),

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn logging_config(config: &ConfigFile, verbose: bool) -> LoggingConfig {
    LoggingConfig {
        level: if verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        },
        directory: config.logging.directory.clone(),
        ..LoggingConfig::default()
    }
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Export(args) => commands::export::run(args).await,
        Commands::Show(args) => commands::show::run(args).await,
        Commands::Init(args) => commands::init::run(args),
        Commands::Config { command } => commands::config::run(command),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken config file still gets console logging; the command reports it.
    let settings = ConfigFile::load().unwrap_or_default();
    let _guard = match init_logging(&logging_config(&settings, cli.verbose)) {
        Ok(guard) => guard,
        Err(e) => {
            let e = CliError::from(e);
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_flags() {
        let cli = Cli::try_parse_from([
            "ptu-capacity",
            "export",
            "--sink",
            "file",
            "--output-dir",
            "/tmp/out",
            "--max-concurrency",
            "8",
            "--skip-failed",
        ])
        .unwrap();

        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.storage.backend, Some(commands::common::BackendArg::File));
        assert_eq!(args.max_concurrency, Some(8));
        assert!(args.skip_failed);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_show_regions() {
        let cli = Cli::try_parse_from(["ptu-capacity", "show", "--regions", "eastus,westus", "-v"])
            .unwrap();

        assert!(cli.verbose);
        let Commands::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.regions, vec!["eastus", "westus"]);
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let mut config = ConfigFile::default();
        config.logging.level = "warn".to_string();

        assert_eq!(logging_config(&config, false).level, "warn");
        assert_eq!(logging_config(&config, true).level, "debug");
    }
}
