//! Budget recommendation command

use std::path::Path;

use anyhow::Result;
use budgetwise_core::BudgetEngine;
use serde_json::json;

use super::{load_budgets, load_ledger, print_json, resolve_as_of, truncate};

pub fn cmd_recommend(
    engine: &BudgetEngine,
    ledger: &Path,
    income: f64,
    budgets: Option<&Path>,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let transactions = load_ledger(engine, ledger)?;
    let existing = load_budgets(budgets)?;
    let as_of = resolve_as_of(as_of)?;

    let current = engine.current_month_spend(&transactions, as_of);
    let allocation = engine.recommend(income, &current, &existing, as_of);

    if json {
        return print_json(&json!({
            "as_of": as_of,
            "income": income,
            "current_spend": current,
            "allocation": allocation,
        }));
    }

    println!();
    println!("💡 Recommended Budgets");
    println!("   As of: {}   Income: ${:.2}", as_of, income);
    println!("   ─────────────────────────────────────────────────────────────");

    if allocation.is_empty() {
        println!("   Income must be positive to recommend budgets.");
        println!();
        return Ok(());
    }

    println!(
        "   Available for budgets: ${:.2}",
        allocation.available_for_budgets
    );
    if allocation.redistributed {
        println!("   Income can't cover every ideal budget; funds were prioritized.");
    }
    println!();
    println!(
        "   {:20} │ {:>10} │ {:>10} │ {:>11}",
        "Category", "Current", "Spent", "Recommended"
    );
    println!("   ─────────────────────┼────────────┼────────────┼─────────────");

    for (category, amount) in &allocation.budgets {
        let limit = existing
            .get(category)
            .map(|l| format!("{:.2}", l))
            .unwrap_or_else(|| "-".to_string());
        let spent = current.get(category).copied().unwrap_or(0.0);
        let marker = if allocation.over_budget.contains(category) {
            " ⚠️"
        } else {
            ""
        };
        println!(
            "   {:20} │ {:>10} │ {:>10.2} │ {:>11.2}{}",
            truncate(category.as_str(), 20),
            limit,
            spent,
            amount,
            marker
        );
    }

    println!("   ─────────────────────┴────────────┴────────────┴─────────────");
    println!("   Total recommended: ${:.2}", allocation.total());

    if !allocation.over_budget.is_empty() {
        println!();
        println!("   ⚠️  Over budget this month (funded at least 105% of spend):");
        for category in &allocation.over_budget {
            println!("      • {}", category);
        }
    }

    for diagnostic in &allocation.diagnostics {
        println!();
        println!("   ❗ {}", diagnostic);
    }

    println!();
    Ok(())
}
