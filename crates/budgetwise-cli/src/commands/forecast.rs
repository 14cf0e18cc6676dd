//! Spending forecast command

use std::path::Path;

use anyhow::Result;
use budgetwise_core::{monthly_history, BudgetEngine, Health, Severity};
use serde_json::json;

use super::{load_budgets, load_ledger, print_json, resolve_as_of, truncate};

fn health_icon(health: Health) -> &'static str {
    match health {
        Health::Excellent | Health::Good => "🟢",
        Health::NeedsAttention => "🟡",
        Health::AtRisk => "🔴",
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "ℹ️ ",
        Severity::Attention => "👀",
        Severity::Warning => "⚠️ ",
        Severity::Alert => "🚨",
    }
}

pub fn cmd_forecast(
    engine: &BudgetEngine,
    ledger: &Path,
    income: f64,
    budgets: Option<&Path>,
    as_of: Option<&str>,
    months: Option<u32>,
    json: bool,
) -> Result<()> {
    let transactions = load_ledger(engine, ledger)?;
    let existing = load_budgets(budgets)?;
    let as_of = resolve_as_of(as_of)?;

    let current = engine.current_month_spend(&transactions, as_of);
    let history = match months {
        Some(months) => monthly_history(&transactions, as_of, months),
        None => engine.history(&transactions, as_of),
    };
    let result = engine.forecast(&current, &history, income, &existing);

    if json {
        return print_json(&json!({
            "as_of": as_of,
            "income": income,
            "history_months": history.keys().map(|k| k.to_string()).collect::<Vec<_>>(),
            "forecast": result,
        }));
    }

    println!();
    println!("🔮 Spending Forecast");
    match (history.keys().next(), history.keys().next_back()) {
        (Some(first), Some(last)) => {
            println!("   History: {} to {}   As of: {}", first, last, as_of)
        }
        _ => println!("   History: none   As of: {}", as_of),
    }
    println!("   ─────────────────────────────────────────────────────────────");

    let predicted: Vec<_> = result
        .predicted
        .iter()
        .filter(|(category, value)| {
            **value > 0.0 || current.get(*category).copied().unwrap_or(0.0) > 0.0
        })
        .collect();

    if predicted.is_empty() {
        println!("   No spending history to forecast from.");
    } else {
        println!(
            "   {:20} │ {:>10} │ {:>10} │ {:>10}",
            "Category", "This month", "Predicted", "Budget"
        );
        println!("   ─────────────────────┼────────────┼────────────┼────────────");
        for (category, value) in predicted {
            let budget = existing
                .get(category)
                .filter(|b| **b > 0.0)
                .map(|b| format!("{:.2}", b))
                .unwrap_or_else(|| "-".to_string());
            let marker = if result.risk_areas.contains(category) {
                " ⚠️"
            } else {
                ""
            };
            println!(
                "   {:20} │ {:>10.2} │ {:>10.2} │ {:>10}{}",
                truncate(category.as_str(), 20),
                current.get(category).copied().unwrap_or(0.0),
                value,
                budget,
                marker
            );
        }
    }

    println!();
    println!(
        "   Predicted total: ${:.2} (this month ${:.2}, {})",
        result.predicted_total, result.current_total, result.trend
    );
    println!("   Predicted savings: ${:.2}", result.predicted_savings);
    println!(
        "   Health: {} {}",
        health_icon(result.health),
        result.health
    );

    println!();
    for rec in &result.recommendations {
        println!("   {} {}", severity_icon(rec.severity), rec.title);
        println!("      {}", rec.message);
    }

    println!();
    Ok(())
}
