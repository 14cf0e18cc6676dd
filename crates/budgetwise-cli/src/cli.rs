//! CLI argument definitions using clap
//!
//! This module contains the clap structs for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budgetwise - Income-aware budget recommendations
#[derive(Parser)]
#[command(name = "budgetwise")]
#[command(about = "Recommend monthly budgets and forecast spending from a ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/budgetwise/budgetwise.toml, then built-in)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the category policy table
    Policy,

    /// Total spend by category
    Aggregate {
        /// Ledger CSV (date,amount,category,description)
        #[arg(short, long)]
        ledger: PathBuf,

        /// Only count transactions on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
    },

    /// Current-month spend against existing budgets
    Status {
        /// Ledger CSV (date,amount,category,description)
        #[arg(short, long)]
        ledger: PathBuf,

        /// Existing budgets CSV (category,monthly_limit)
        #[arg(short, long)]
        budgets: PathBuf,

        /// Evaluate as of this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Recommend monthly budgets for every category
    Recommend {
        /// Ledger CSV (date,amount,category,description)
        #[arg(short, long)]
        ledger: PathBuf,

        /// Monthly income
        #[arg(short, long)]
        income: f64,

        /// Existing budgets CSV (category,monthly_limit)
        #[arg(short, long)]
        budgets: Option<PathBuf>,

        /// Evaluate as of this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Forecast next month's spending
    Forecast {
        /// Ledger CSV (date,amount,category,description)
        #[arg(short, long)]
        ledger: PathBuf,

        /// Monthly income
        #[arg(short, long)]
        income: f64,

        /// Existing budgets CSV (category,monthly_limit)
        #[arg(short, long)]
        budgets: Option<PathBuf>,

        /// Evaluate as of this date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,

        /// Months of history to use (defaults to the configured value)
        #[arg(short, long)]
        months: Option<u32>,
    },

    /// Classify an expense description
    Classify {
        /// Description text, e.g. "Taxi to airport"
        text: String,
    },
}
