// townlink CLI - rebuild the civic address lookup from municipal source tables

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use townlink_address::Normalizer;

use exit_codes::{EXIT_DATA_QUALITY, EXIT_ERROR, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "townlink")]
#[command(about = "Address normalization and resident / parcel / utility record linkage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link the configured sources and write the lookup tables
    #[command(after_help = "\
Examples:
  townlink run andover.toml
  townlink run andover.toml --json
  townlink run andover.toml --release-only
  RUST_LOG=debug townlink run andover.toml")]
    Run {
        /// Path to the linkage TOML config file
        config: PathBuf,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write only the release Lookup table, even when debug output is configured
        #[arg(long)]
        release_only: bool,
    },

    /// Validate a linkage config without reading any source
    #[command(after_help = "\
Examples:
  townlink validate andover.toml")]
    Validate {
        /// Path to the linkage TOML config file
        config: PathBuf,
    },

    /// Normalize one address and print its parts as JSON
    #[command(after_help = "\
Examples:
  townlink normalize '12 Main Street Apt 4' --city Andover
  townlink normalize '22-24 Birch Cir' --city Andover")]
    Normalize {
        /// Free-form street address
        address: String,

        /// City the address belongs to
        #[arg(long)]
        city: String,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn cmd_normalize(address: String, city: String) -> Result<(), CliError> {
    let normalizer = Normalizer::for_cities([city.as_str()]);
    let normalized = normalizer.normalize(&address, &city).map_err(|e| CliError {
        code: EXIT_DATA_QUALITY,
        message: e.to_string(),
        hint: None,
    })?;

    let json_str = serde_json::to_string_pretty(&normalized).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    println!("{json_str}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    let result = match cli.command {
        Commands::Run { config, json, release_only } => run::cmd_run(config, json, release_only),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Normalize { address, city } => cmd_normalize(address, city),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
