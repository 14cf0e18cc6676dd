//! Budgetwise CLI - Budget recommendations and spending forecasts
//!
//! Usage:
//!   budgetwise policy                                   Show the policy table
//!   budgetwise aggregate --ledger CSV                   Spend by category
//!   budgetwise status --ledger CSV --budgets CSV        Spend vs budgets
//!   budgetwise recommend --ledger CSV --income 5000     Recommend budgets
//!   budgetwise forecast --ledger CSV --income 5000      Forecast next month
//!   budgetwise classify "Taxi to airport"               Classify a description

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let engine = commands::load_engine(cli.config.as_deref())?;

    match cli.command {
        Commands::Policy => commands::cmd_policy(&engine, cli.json),
        Commands::Aggregate { ledger, since } => {
            commands::cmd_aggregate(&engine, &ledger, since.as_deref(), cli.json)
        }
        Commands::Status {
            ledger,
            budgets,
            as_of,
        } => commands::cmd_status(&engine, &ledger, &budgets, as_of.as_deref(), cli.json),
        Commands::Recommend {
            ledger,
            income,
            budgets,
            as_of,
        } => commands::cmd_recommend(
            &engine,
            &ledger,
            income,
            budgets.as_deref(),
            as_of.as_deref(),
            cli.json,
        ),
        Commands::Forecast {
            ledger,
            income,
            budgets,
            as_of,
            months,
        } => commands::cmd_forecast(
            &engine,
            &ledger,
            income,
            budgets.as_deref(),
            as_of.as_deref(),
            months,
            cli.json,
        ),
        Commands::Classify { text } => commands::cmd_classify(&engine, &text, cli.json),
    }
}
