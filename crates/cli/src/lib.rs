pub mod adapters;
pub mod commands;
pub mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "trialquote",
    about = "Trialquote operator CLI",
    long_about = "Derive clinical-trial quotation fields from form submissions, deliver quotation documents, and inspect runtime readiness.",
    after_help = "Examples:\n  trialquote transform --input answers.json\n  trialquote quote --input responses.json --issued-on 2026-04-01\n  trialquote doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the derived quotation fields for the latest submission in a JSON file")]
    Transform {
        #[arg(long, help = "Submission JSON: a field map, one submission, or a list of submissions")]
        input: PathBuf,
    },
    #[command(about = "Quote the latest submission, write the document and queue the notification")]
    Quote {
        #[arg(long, help = "Submission JSON: a field map, one submission, or a list of submissions")]
        input: PathBuf,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Issue date printed on the quotation (default: today)")]
        issued_on: Option<NaiveDate>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, output and outbox directories, and the quotation template")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Transform { input } => commands::transform::run(&input),
        Command::Quote { input, issued_on } => commands::quote::run(&input, issued_on),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
