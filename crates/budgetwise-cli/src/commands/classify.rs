//! Description classification command

use anyhow::Result;
use budgetwise_core::{BudgetEngine, Classifier};

use super::print_json;

pub fn cmd_classify(engine: &BudgetEngine, text: &str, json: bool) -> Result<()> {
    let classifier = engine.keyword_classifier()?;
    let result = classifier.classify(text);

    if json {
        return print_json(&result);
    }

    println!(
        "🏷️  {} → {} ({:.0}% confidence)",
        text,
        result.category,
        result.confidence * 100.0
    );
    Ok(())
}
