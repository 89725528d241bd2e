//! oas-compat: OpenAPI schema compatibility checker
//!
//! Compares a baseline schema against a candidate and reports whether the
//! candidate can serve the baseline's clients.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use oas_compat::cli::{self, CheckConfig};
use oas_compat::pipeline::exit_codes;
use oas_compat::report::ReportFormat;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "oas-compat")]
#[command(version)]
#[command(about = "OpenAPI schema compatibility checker", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Compatible (PASS)
    1  Breaking changes detected (FAIL)
    2  Error occurred

EXAMPLES:
    # Compare two schema files
    oas-compat check baseline.json candidate.json

    # Machine-readable report for CI
    oas-compat check baseline.json candidate.json --format json > report.json

    # Cross-deployment check with path rewriting and ignores
    oas-compat check oss.json cloud.json --options compare-options.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `check` subcommand
#[derive(Parser)]
struct CheckArgs {
    /// Path to the baseline schema (the contract clients rely on)
    old: PathBuf,

    /// Path to the candidate schema
    new: PathBuf,

    /// Output format (json, summary)
    #[arg(short, long, default_value = "summary")]
    format: ReportFormat,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Compare options file (JSON: path rewrite, ignores, skip tags)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Abort if loading a schema takes longer than this many seconds
    #[arg(long, env = "OAS_COMPAT_TIMEOUT")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schemas for backward compatibility
    Check(CheckArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Check(args) => {
            let config = CheckConfig {
                old: args.old,
                new: args.new,
                format: args.format,
                output_file: args.output_file,
                options_file: args.options,
                timeout: args.timeout.map(Duration::from_secs),
            };
            match cli::run_check(config) {
                Ok(exit_code) => {
                    if exit_code != 0 {
                        std::process::exit(exit_code);
                    }
                    Ok(())
                }
                Err(err) => {
                    eprintln!("error: {err:#}");
                    std::process::exit(exit_codes::ERROR);
                }
            }
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "oas-compat", &mut io::stdout());
            Ok(())
        }
    }
}
