//! Policy table display

use anyhow::Result;
use budgetwise_core::{BudgetEngine, Category, CategoryPolicy};
use serde::Serialize;

use super::{print_json, truncate};

#[derive(Serialize)]
struct PolicyRow<'a> {
    category: &'a str,
    #[serde(flatten)]
    policy: &'a CategoryPolicy,
}

pub fn cmd_policy(engine: &BudgetEngine, json: bool) -> Result<()> {
    let policies = engine.policies();

    // Serving order: priority, then canonical category order
    let mut rows: Vec<(&Category, &CategoryPolicy)> = policies.iter().collect();
    rows.sort_by(|a, b| a.1.priority.cmp(&b.1.priority).then_with(|| a.0.cmp(b.0)));

    if json {
        let mut out: Vec<PolicyRow> = rows
            .iter()
            .map(|(category, policy)| PolicyRow {
                category: category.as_str(),
                policy: *policy,
            })
            .collect();
        out.push(PolicyRow {
            category: "(default)",
            policy: policies.default_policy(),
        });
        return print_json(&out);
    }

    println!();
    println!("📋 Category Policies");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:18} │ {:>3} │ {:>6} │ {:>6} │ {:>6} │ {}",
        "Category", "Pri", "Min", "Base", "Max", "Essential"
    );
    println!("   ───────────────────┼─────┼────────┼────────┼────────┼──────────");

    let print_row = |label: &str, policy: &CategoryPolicy| {
        println!(
            "   {:18} │ {:>3} │ {:>5.1}% │ {:>5.1}% │ {:>5.1}% │ {}",
            truncate(label, 18),
            policy.priority,
            policy.min_percent * 100.0,
            policy.base_percent * 100.0,
            policy.max_percent * 100.0,
            if policy.essential { "yes" } else { "no" }
        );
    };

    for (category, policy) in &rows {
        print_row(category.as_str(), *policy);
    }
    print_row("(default)", policies.default_policy());

    println!();
    println!("   Percentages are shares of monthly income.");
    println!("   Unlisted categories use the default policy.");
    println!();
    Ok(())
}
