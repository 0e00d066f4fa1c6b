pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::price::PriceArgs;

#[derive(Debug, Parser)]
#[command(
    name = "transpak",
    about = "TransPak AI Quoter operator CLI",
    long_about = "Operate the TransPak quoter: migrations, demo data, config inspection, \
                  readiness checks and offline pricing.",
    after_help = "Examples:\n  transpak doctor --json\n  transpak config\n  \
                  transpak price --dimensions 48x36x24 --weight 350 --origin \"San Jose, CA\" \
                  --destination \"Austin, TX\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the three deterministic demo shipments with generated quotes")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and LLM readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a shipment offline and print the cost breakdown")]
    Price {
        #[arg(long, help = "Dimensions in inches, e.g. 48x36x24")]
        dimensions: String,
        #[arg(long, help = "Weight in pounds, e.g. \"350 lbs\"")]
        weight: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long, help = "Standard | Fragile | High Value | Extremely Fragile")]
        fragility: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Special handling requirements, free text")]
        requirements: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            let (healthy, output) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if healthy { 0 } else { 1 }, output }
        }
        Command::Price {
            dimensions,
            weight,
            origin,
            destination,
            fragility,
            description,
            requirements,
        } => commands::price::run(PriceArgs {
            dimensions,
            weight,
            origin,
            destination,
            fragility,
            description,
            requirements,
        }),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
