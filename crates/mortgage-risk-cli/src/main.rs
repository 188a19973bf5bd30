mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::affordability::{AffordArgs, CompareArgs, ReportArgs};
use commands::amortization::{PaymentArgs, ScheduleArgs};
use commands::risk::RiskArgs;

/// Mortgage affordability and risk analysis
#[derive(Parser)]
#[command(
    name = "mrc",
    version,
    about = "Mortgage affordability and risk analysis",
    long_about = "A CLI for mortgage affordability, amortization and borrower risk \
                  calculations with decimal precision. Supports priced and \
                  max-affordability scenarios, amortization schedules, risk scoring, \
                  and scenario comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver and cache activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly principal and interest payment
    Payment(PaymentArgs),
    /// Run a full affordability scenario (priced or max affordability)
    Afford(AffordArgs),
    /// Month-by-month amortization schedule
    Schedule(ScheduleArgs),
    /// Borrower risk score from DTI, LTV and credit band
    Risk(RiskArgs),
    /// Structured report document for a scenario
    Report(ReportArgs),
    /// Save two scenarios and compare them
    Compare(CompareArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Payment(args) => commands::amortization::run_payment(args),
        Commands::Afford(args) => commands::affordability::run_afford(args),
        Commands::Schedule(args) if matches!(cli.output, OutputFormat::Csv) => {
            if let Err(e) = commands::amortization::export_schedule_csv(&args) {
                fail(e);
            }
            return;
        }
        Commands::Schedule(args) => commands::amortization::run_schedule(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Report(args) => commands::affordability::run_report(args),
        Commands::Compare(args) => commands::affordability::run_compare(args),
        Commands::Version => {
            println!("mrc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}

fn fail(e: Box<dyn std::error::Error>) -> ! {
    eprintln!("{}: {}", "error".red().bold(), e);
    process::exit(1);
}
