//! Budget status checks
//!
//! Read-only comparisons of spend against the existing limits: per-category
//! status rows, a ledger-wide summary and the single-expense alert raised
//! when one entry alone is larger than its category's budget.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::models::{total, BudgetMap, Category, SpendTotals, Transaction};

/// Spend vs limit for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatus {
    pub category: Category,
    /// Existing monthly limit (0 = unset)
    pub limit: f64,
    pub spent: f64,
    /// `max(0, limit - spent)`
    pub remaining: f64,
    /// Share of the limit used; `None` when no limit is set
    pub percent_used: Option<f64>,
    pub over_budget: bool,
}

/// Ledger-wide totals against the sum of all limits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub total_spending: f64,
    pub transaction_count: usize,
    /// Distinct categories with at least one transaction
    pub category_count: usize,
    pub total_budget: f64,
    /// `max(0, total_budget - total_spending)`
    pub remaining_budget: f64,
}

/// Status rows for every category with a limit or with spend
///
/// Over budget means spend exceeds the limit, so spend in a category with no
/// limit counts as over.
pub fn budget_status(current_spend: &SpendTotals, existing: &BudgetMap) -> Vec<CategoryStatus> {
    let categories: BTreeSet<&Category> = existing
        .iter()
        .filter(|(_, limit)| **limit > 0.0)
        .chain(current_spend.iter().filter(|(_, spent)| **spent > 0.0))
        .map(|(category, _)| category)
        .collect();

    categories
        .into_iter()
        .map(|category| {
            let limit = existing.get(category).copied().unwrap_or(0.0);
            let spent = current_spend.get(category).copied().unwrap_or(0.0);
            CategoryStatus {
                category: category.clone(),
                limit,
                spent,
                remaining: (limit - spent).max(0.0),
                percent_used: (limit > 0.0).then(|| spent / limit * 100.0),
                over_budget: spent > limit,
            }
        })
        .collect()
}

pub fn spending_summary(transactions: &[Transaction], budgets: &BudgetMap) -> SpendingSummary {
    let total_spending: f64 = transactions.iter().map(|tx| tx.amount).sum();
    let category_count = transactions
        .iter()
        .map(|tx| &tx.category)
        .collect::<HashSet<_>>()
        .len();
    let total_budget = total(budgets);

    SpendingSummary {
        total_spending,
        transaction_count: transactions.len(),
        category_count,
        total_budget,
        remaining_budget: (total_budget - total_spending).max(0.0),
    }
}

/// The limit a single expense exceeds, if any
///
/// Only categories with a set (non-zero) limit can trigger the alert.
pub fn expense_exceeds_budget(tx: &Transaction, budgets: &BudgetMap) -> Option<f64> {
    budgets
        .get(&tx.category)
        .copied()
        .filter(|limit| *limit > 0.0 && tx.amount > *limit)
}
