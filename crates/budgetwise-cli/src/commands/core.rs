//! Shared utilities for commands
//!
//! This module contains:
//! - `load_engine` - Resolve config and build the engine
//! - `load_ledger` / `load_budgets` - Read the CSV inputs
//! - `resolve_as_of` - Parse an optional `--as-of` date
//! - `print_json` - Pretty JSON output for `--json`

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use budgetwise_core::{parse_budgets, parse_ledger, BudgetEngine, BudgetMap, Config, Transaction};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

pub fn load_engine(config_path: Option<&Path>) -> Result<BudgetEngine> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    Ok(BudgetEngine::new(config))
}

/// Read a ledger, classifying rows with a blank category
pub fn load_ledger(engine: &BudgetEngine, path: &Path) -> Result<Vec<Transaction>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;
    let classifier = engine.keyword_classifier()?;
    let transactions = parse_ledger(file, &classifier)
        .with_context(|| format!("Failed to parse ledger {}", path.display()))?;
    debug!("Loaded {} transactions from {}", transactions.len(), path.display());
    Ok(transactions)
}

/// Read existing budgets; no path means no budgets set
pub fn load_budgets(path: Option<&Path>) -> Result<BudgetMap> {
    let Some(path) = path else {
        return Ok(BudgetMap::new());
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open budgets {}", path.display()))?;
    parse_budgets(file).with_context(|| format!("Failed to parse budgets {}", path.display()))
}

pub fn parse_date_arg(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

/// `--as-of` if given, otherwise today
pub fn resolve_as_of(as_of: Option<&str>) -> Result<NaiveDate> {
    match as_of {
        Some(value) => parse_date_arg(value, "--as-of"),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
