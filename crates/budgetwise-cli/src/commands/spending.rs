//! Spending commands (aggregate, status)

use std::path::Path;

use anyhow::Result;
use budgetwise_core::{
    budget_status, expense_exceeds_budget, month_start, spending_summary, BudgetEngine,
};
use serde_json::json;

use super::{load_budgets, load_ledger, parse_date_arg, print_json, resolve_as_of, truncate};

pub fn cmd_aggregate(
    engine: &BudgetEngine,
    ledger: &Path,
    since: Option<&str>,
    json: bool,
) -> Result<()> {
    let transactions = load_ledger(engine, ledger)?;
    let window_start = since.map(|s| parse_date_arg(s, "--since")).transpose()?;
    let totals = engine.aggregate(&transactions, window_start);

    if json {
        return print_json(&totals);
    }

    let grand_total: f64 = totals.values().sum();

    println!();
    println!("📊 Spending by Category");
    match window_start {
        Some(start) => println!("   Since: {}", start),
        None => println!("   Period: all time"),
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if grand_total <= 0.0 {
        println!("   No spending found in this period.");
        println!();
        return Ok(());
    }

    println!("   Total: ${:.2}", grand_total);
    println!();
    println!("   {:20} │ {:>10} │ {:>6}", "Category", "Amount", "%");
    println!("   ─────────────────────┼────────────┼────────");
    for (category, amount) in &totals {
        println!(
            "   {:20} │ {:>10.2} │ {:>5.1}%",
            truncate(category.as_str(), 20),
            amount,
            amount / grand_total * 100.0
        );
    }
    println!();
    Ok(())
}

pub fn cmd_status(
    engine: &BudgetEngine,
    ledger: &Path,
    budgets: &Path,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let transactions = load_ledger(engine, ledger)?;
    let existing = load_budgets(Some(budgets))?;
    let as_of = resolve_as_of(as_of)?;

    let current = engine.current_month_spend(&transactions, as_of);
    let rows = budget_status(&current, &existing);

    let start = month_start(as_of);
    let month_transactions: Vec<_> = transactions
        .iter()
        .filter(|tx| tx.date >= start && tx.date <= as_of)
        .cloned()
        .collect();
    let summary = spending_summary(&month_transactions, &existing);
    let large: Vec<_> = month_transactions
        .iter()
        .filter_map(|tx| expense_exceeds_budget(tx, &existing).map(|limit| (tx, limit)))
        .collect();

    if json {
        let large_json: Vec<_> = large
            .iter()
            .map(|(tx, limit)| {
                json!({
                    "date": tx.date,
                    "category": tx.category,
                    "amount": tx.amount,
                    "description": tx.description,
                    "limit": limit,
                })
            })
            .collect();
        return print_json(&json!({
            "as_of": as_of,
            "summary": summary,
            "categories": rows,
            "large_expenses": large_json,
        }));
    }

    println!();
    println!("📊 Budget Status");
    println!("   Month: {} to {}", start, as_of);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Spent: ${:.2} of ${:.2} ({} transactions, {} categories)",
        summary.total_spending,
        summary.total_budget,
        summary.transaction_count,
        summary.category_count
    );
    println!("   Remaining: ${:.2}", summary.remaining_budget);
    println!();

    if rows.is_empty() {
        println!("   No budgets or spending this month.");
        println!();
        return Ok(());
    }

    println!(
        "   {:20} │ {:>10} │ {:>10} │ {:>10} │ {:>6}",
        "Category", "Limit", "Spent", "Remaining", "Used"
    );
    println!("   ─────────────────────┼────────────┼────────────┼────────────┼────────");
    for row in &rows {
        let used = row
            .percent_used
            .map(|p| format!("{:.0}%", p))
            .unwrap_or_else(|| "-".to_string());
        let marker = if row.over_budget { " ⚠️" } else { "" };
        println!(
            "   {:20} │ {:>10.2} │ {:>10.2} │ {:>10.2} │ {:>6}{}",
            truncate(row.category.as_str(), 20),
            row.limit,
            row.spent,
            row.remaining,
            used,
            marker
        );
    }

    let over = rows.iter().filter(|r| r.over_budget).count();
    if over > 0 {
        println!();
        println!("   ⚠️  {} categor{} over budget", over, if over == 1 { "y" } else { "ies" });
    }

    if !large.is_empty() {
        println!();
        println!("   🔔 Single expenses larger than their budget:");
        for (tx, limit) in &large {
            println!(
                "      {} {} ${:.2} (limit ${:.2}){}",
                tx.date,
                tx.category,
                tx.amount,
                limit,
                tx.description
                    .as_deref()
                    .map(|d| format!(" - {}", truncate(d, 30)))
                    .unwrap_or_default()
            );
        }
    }

    println!();
    Ok(())
}
