use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use crypto_taxes::commands::holdings::holdings;
use crypto_taxes::commands::report::report;
use crypto_taxes::models::CostBasis;
use crypto_taxes::{load_report_config, OutputFormat};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match load_report_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.subcommand {
        Command::Report { file, avg, format } => {
            if avg {
                config.cost_basis = CostBasis::Average;
            }
            if let Some(format) = format {
                config.format = format;
            }
            match report(&file, &config, &mut out) {
                Ok(summary) => {
                    tracing::info!(sales = summary.sales, rejected = summary.rejected, "report complete");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error creating tax report from {:?}: {:#}", file, e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Holdings { file } => match holdings(&file, &mut out) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error creating holdings report from {:?}: {:#}", file, e);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("crypto_taxes=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crypto_taxes=info"))
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

#[derive(Subcommand)]
enum Command {
    /// Replay a Coinbase transaction history and list every taxable sale
    Report {
        /// Coinbase standard-account transaction history CSV
        #[clap(long)]
        file: PathBuf,
        /// Average cost basis (FIFO is default)
        #[clap(long)]
        avg: bool,
        /// text, csv or json
        #[clap(long)]
        format: Option<OutputFormat>,
    },
    /// Export a CSV of the quantity and basis still held per asset
    Holdings {
        /// Coinbase standard-account transaction history CSV
        #[clap(long)]
        file: PathBuf,
    },
}

#[derive(Parser)]
#[clap(version, about = "FIFO and average-cost capital gains from a Coinbase transaction history")]
struct Cli {
    /// Turns on debug logging
    #[clap(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    subcommand: Command,
}
