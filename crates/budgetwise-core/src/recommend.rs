//! Recommendation generator
//!
//! Computes an unconstrained "ideal" monthly budget for every category from
//! income, policy and current-month spend. The income ceiling is not enforced
//! here; the ideal plan is handed to the redistribution pipeline as-is.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{total, BudgetMap, Category, SpendTotals};
use crate::policy::PolicyTable;

/// Ideal budgets plus the context the redistribution pipeline needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdealPlan {
    pub income: f64,
    /// Income net of current spend, never below the configured floor share
    pub available_for_budgets: f64,
    pub ideal: BudgetMap,
    /// Categories whose current spend exceeds their existing limit
    pub over_budget: BTreeSet<Category>,
}

impl IdealPlan {
    pub fn total_ideal(&self) -> f64 {
        total(&self.ideal)
    }
}

/// Computes ideal budgets against a policy table
pub struct RecommendationGenerator<'a> {
    policies: &'a PolicyTable,
    config: &'a EngineConfig,
}

impl<'a> RecommendationGenerator<'a> {
    pub fn new(policies: &'a PolicyTable, config: &'a EngineConfig) -> Self {
        Self { policies, config }
    }

    /// Pool eligible for allocation: `max(income - spent, income * floor)`
    pub fn available_for_budgets(&self, income: f64, current_spend: &SpendTotals) -> f64 {
        let spent: f64 = current_spend.values().map(|v| v.max(0.0)).sum();
        (income - spent).max(income * self.config.available_floor_percent)
    }

    /// Over-budget when spend exceeds the existing limit (missing limit = 0)
    pub fn is_over_budget(spend: f64, existing: &BudgetMap, category: &Category) -> bool {
        spend > existing.get(category).copied().unwrap_or(0.0)
    }

    /// Guaranteed funding for an over-budget category
    pub fn over_budget_floor(&self, spend: f64, min_budget: f64) -> f64 {
        (spend * self.config.over_budget_factor).max(min_budget)
    }

    /// Build the ideal plan, or `None` when income is not positive
    pub fn ideal_budgets(
        &self,
        income: f64,
        current_spend: &SpendTotals,
        existing: &BudgetMap,
        as_of: NaiveDate,
    ) -> Option<IdealPlan> {
        if !(income > 0.0 && income.is_finite()) {
            debug!("Income {} is not positive, skipping recommendation", income);
            return None;
        }

        let available_for_budgets = self.available_for_budgets(income, current_spend);
        let month_progress = f64::from(as_of.day()) / self.config.days_per_month;

        let categories: BTreeSet<&Category> = self
            .policies
            .categories()
            .chain(current_spend.keys())
            .collect();

        let mut ideal = BTreeMap::new();
        let mut over_budget = BTreeSet::new();

        for category in categories {
            if !self.policies.contains(category) {
                warn!("No policy for {}, using the default policy", category);
            }
            let policy = self.policies.policy(category);
            let spend = current_spend.get(category).copied().unwrap_or(0.0).max(0.0);
            let min_budget = policy.min_budget(income);
            let base_budget = policy.base_budget(income);
            let max_budget = policy.max_budget(income);

            let amount = if Self::is_over_budget(spend, existing, category) {
                over_budget.insert(category.clone());
                self.over_budget_floor(spend, min_budget)
            } else if spend > 0.0 {
                let projected = if month_progress > self.config.early_month_cutoff {
                    spend / month_progress
                } else {
                    spend + base_budget * self.config.early_month_base_factor
                };
                let clamped = projected.max(min_budget).min(max_budget);
                clamped.max(spend * self.config.spend_headroom_factor)
            } else if policy.essential {
                base_budget
            } else {
                min_budget
            };

            ideal.insert(category.clone(), amount);
        }

        debug!(
            "Ideal budgets total {:.2} against {:.2} available ({} over budget)",
            total(&ideal),
            available_for_budgets,
            over_budget.len()
        );

        Some(IdealPlan {
            income,
            available_for_budgets,
            ideal,
            over_budget,
        })
    }
}
