//! Spend aggregation
//!
//! Reduces a ledger snapshot into per-category totals for a window. The
//! result always carries every configured category so callers never have to
//! special-case "no spend yet".

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{MonthKey, SpendTotals, Transaction};
use crate::policy::PolicyTable;

/// Sum transaction amounts by category for `date >= window_start`
///
/// `None` means all time. Categories seen in the ledger but missing from the
/// policy table are included as-is.
pub fn aggregate(
    transactions: &[Transaction],
    window_start: Option<NaiveDate>,
    policies: &PolicyTable,
) -> SpendTotals {
    let mut totals = zeroed(policies);

    for tx in transactions {
        if window_start.is_some_and(|start| tx.date < start) {
            continue;
        }
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }

    totals
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    MonthKey::from_date(date).first_day().unwrap_or(date)
}

/// Per-month totals for the `months` complete months before `as_of`'s month
///
/// Every month in the window is present, but a month only lists the
/// categories that actually had spend in it; the forecast treats a missing
/// entry as "no data" rather than a zero month. Transactions outside the
/// window are ignored.
pub fn monthly_history(
    transactions: &[Transaction],
    as_of: NaiveDate,
    months: u32,
) -> BTreeMap<MonthKey, SpendTotals> {
    let mut history = BTreeMap::new();
    let mut key = MonthKey::from_date(as_of);
    for _ in 0..months {
        key = key.previous();
        history.insert(key, SpendTotals::new());
    }

    for tx in transactions {
        let tx_key = MonthKey::from_date(tx.date);
        if let Some(month) = history.get_mut(&tx_key) {
            *month.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
        }
    }

    history
}

fn zeroed(policies: &PolicyTable) -> SpendTotals {
    policies.categories().map(|c| (c.clone(), 0.0)).collect()
}
