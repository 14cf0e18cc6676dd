//! CSV import for ledgers and existing budgets
//!
//! Ledger: `date,amount,category,description`. Only `date` and `amount` are
//! required columns; a row with a blank category is labelled by running its
//! description through a [`Classifier`].
//!
//! Budgets: `category,monthly_limit`.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::error::{Error, Result};
use crate::models::{BudgetMap, Category, Transaction};

/// Column positions resolved from a header row
struct Columns {
    indices: Vec<Option<usize>>,
}

impl Columns {
    fn resolve(headers: &StringRecord, names: &[&str]) -> Self {
        let indices = names
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(name))
            })
            .collect();
        Self { indices }
    }

    fn require(&self, slot: usize, name: &str) -> Result<usize> {
        self.indices
            .get(slot)
            .copied()
            .flatten()
            .ok_or_else(|| Error::Import(format!("Missing required column: {}", name)))
    }

    /// Non-empty trimmed value in an optional column
    fn optional<'r>(&self, slot: usize, record: &'r StringRecord) -> Option<&'r str> {
        let index = self.indices.get(slot).copied().flatten()?;
        record.get(index).map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Parse a ledger CSV into transactions
///
/// `line` in error messages counts the header as line 1.
pub fn parse_ledger<R: Read>(reader: R, classifier: &dyn Classifier) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers, &["date", "amount", "category", "description"]);
    let date_col = columns.require(0, "date")?;
    let amount_col = columns.require(1, "amount")?;

    let mut transactions = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = i + 2;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let date_str = record
            .get(date_col)
            .ok_or_else(|| Error::Import(format!("Line {}: missing date", line)))?;
        let date = parse_date(date_str).map_err(|e| at_line(line, e))?;

        let amount_str = record
            .get(amount_col)
            .ok_or_else(|| Error::Import(format!("Line {}: missing amount", line)))?;
        let amount = parse_amount(amount_str).map_err(|e| at_line(line, e))?;
        if amount < 0.0 {
            return Err(Error::Import(format!(
                "Line {}: negative amount {}",
                line, amount
            )));
        }

        let description = columns.optional(3, &record).map(str::to_string);
        let category = match (columns.optional(2, &record), description.as_deref()) {
            (Some(label), _) => Category::parse(label),
            (None, Some(text)) => {
                let predicted = classifier.classify(text);
                debug!(
                    "Line {}: classified {:?} as {} ({:.2})",
                    line, text, predicted.category, predicted.confidence
                );
                predicted.category
            }
            (None, None) => {
                warn!("Line {}: no category or description, using Other", line);
                Category::Other
            }
        };

        let mut tx = Transaction::new(date, amount, category);
        tx.description = description;
        transactions.push(tx);
    }

    debug!("Parsed {} ledger rows", transactions.len());
    Ok(transactions)
}

/// Parse an existing-budgets CSV
///
/// Repeated categories keep the last limit seen.
pub fn parse_budgets<R: Read>(reader: R) -> Result<BudgetMap> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers, &["category", "monthly_limit"]);
    let category_col = columns.require(0, "category")?;
    let limit_col = columns.require(1, "monthly_limit")?;

    let mut budgets = BudgetMap::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = i + 2;

        let label = record.get(category_col).unwrap_or("").trim();
        if label.is_empty() {
            continue;
        }

        let limit_str = record
            .get(limit_col)
            .ok_or_else(|| Error::Import(format!("Line {}: missing monthly_limit", line)))?;
        let limit = parse_amount(limit_str).map_err(|e| at_line(line, e))?;
        if limit < 0.0 {
            return Err(Error::Import(format!(
                "Line {}: monthly_limit must not be negative",
                line
            )));
        }

        let category = Category::parse(label);
        if budgets.insert(category.clone(), limit).is_some() {
            warn!("Line {}: duplicate budget for {}, keeping the last", line, category);
        }
    }

    Ok(budgets)
}

fn at_line(line: usize, err: Error) -> Error {
    match err {
        Error::Import(msg) => Error::Import(format!("Line {}: {}", line, msg)),
        other => other,
    }
}

/// Parse a date string in the formats ledgers commonly use
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2026-03-15
        "%m/%d/%Y", // 03/15/2026
        "%m/%d/%y", // 03/15/26
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount, tolerating currency symbols and thousands separators
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().replace(['$', ',', ' '], "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))?;
    if !amount.is_finite() {
        return Err(Error::Import(format!("Amount is not finite: {}", s)));
    }
    Ok(amount)
}
