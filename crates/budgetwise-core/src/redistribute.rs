//! Redistribution pipeline
//!
//! Reconciles ideal budgets with the income constraint. Each pass takes an
//! immutable snapshot of the budgets and returns a new mapping:
//!
//! 1. **Priority order** - `(priority asc, over-budget first, ideal desc)`
//! 2. **Minimum guarantee** - walk the order funding each category's minimum
//!    (capped at a multiple of it) until the pool runs out
//! 3. **Surplus** - spread what's left in proportion to first-pass shares
//! 4. **Hard cap** - uniform scale down to the available pool
//! 5. **Floor correction** - over-budget categories back up to their floor
//! 6. **Ceiling clamp** - policy maximum share of income
//! 7. **Finalize** - round to cents, emergency scale if floors pushed the
//!    total past the tolerance band
//!
//! Passes 2 and 3 only run when the ideal total exceeds the pool.
//!
//! Pass 4 can push an over-budget category under its floor before pass 5
//! restores it, so the total may briefly oscillate around the cap.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::{total, BudgetMap, Category, SpendTotals};
use crate::policy::PolicyTable;
use crate::recommend::IdealPlan;

/// Slack for comparisons against cent-rounded totals
const EPSILON: f64 = 0.005;

/// Something worth telling the caller about a finished allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationDiagnostic {
    /// Floor corrections pushed the total past the tolerance band and the
    /// non-protected categories were scaled down to compensate
    EmergencyScaled { factor: f64 },
    /// Over-budget floors alone exceed the tolerance band; the total is
    /// still over after the emergency scale
    ToleranceExceeded { total: f64, limit: f64 },
}

impl fmt::Display for AllocationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationDiagnostic::EmergencyScaled { factor } => {
                write!(f, "emergency scale-down applied (factor {:.4})", factor)
            }
            AllocationDiagnostic::ToleranceExceeded { total, limit } => write!(
                f,
                "allocation total {:.2} exceeds tolerance limit {:.2}",
                total, limit
            ),
        }
    }
}

/// Recommended monthly limits
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Allocation {
    /// Category -> recommended limit, rounded to cents
    pub budgets: BudgetMap,
    pub available_for_budgets: f64,
    pub over_budget: BTreeSet<Category>,
    /// Whether the ideal total exceeded the pool and passes 2-3 ran
    pub redistributed: bool,
    pub diagnostics: Vec<AllocationDiagnostic>,
}

impl Allocation {
    /// Allocation for non-positive income
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }

    pub fn total(&self) -> f64 {
        total(&self.budgets)
    }

    pub fn get(&self, category: &Category) -> Option<f64> {
        self.budgets.get(category).copied()
    }
}

/// Round to 2 decimals
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Runs the redistribution passes for one ideal plan
pub struct Redistributor<'a> {
    policies: &'a PolicyTable,
    config: &'a EngineConfig,
    plan: &'a IdealPlan,
    current_spend: &'a SpendTotals,
}

impl<'a> Redistributor<'a> {
    pub fn new(
        policies: &'a PolicyTable,
        config: &'a EngineConfig,
        plan: &'a IdealPlan,
        current_spend: &'a SpendTotals,
    ) -> Self {
        Self {
            policies,
            config,
            plan,
            current_spend,
        }
    }

    /// Run the full pipeline
    pub fn redistribute(&self) -> Allocation {
        let available = self.plan.available_for_budgets;
        let total_ideal = self.plan.total_ideal();
        let redistributed = total_ideal > available;

        let budgets = if redistributed {
            debug!(
                "Ideal total {:.2} exceeds available {:.2}, redistributing",
                total_ideal, available
            );
            let order = self.priority_order();
            let (first_pass, remaining) = self.guarantee_minimums(&order);
            self.distribute_surplus(&first_pass, remaining)
        } else {
            self.plan.ideal.clone()
        };

        let budgets = self.enforce_cap(&budgets);
        let budgets = self.restore_floors(&budgets);
        let budgets = self.clamp_ceilings(&budgets);
        let (budgets, diagnostics) = self.finalize(&budgets);

        Allocation {
            budgets,
            available_for_budgets: available,
            over_budget: self.plan.over_budget.clone(),
            redistributed,
            diagnostics,
        }
    }

    fn spend(&self, category: &Category) -> f64 {
        self.current_spend
            .get(category)
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    }

    fn ideal(&self, category: &Category) -> f64 {
        self.plan.ideal.get(category).copied().unwrap_or(0.0)
    }

    fn is_over_budget(&self, category: &Category) -> bool {
        self.plan.over_budget.contains(category)
    }

    /// Floor an over-budget category must end at
    fn over_budget_floor(&self, category: &Category) -> f64 {
        self.spend(category) * self.config.over_budget_factor
    }

    /// Categories in serving order
    pub fn priority_order(&self) -> Vec<Category> {
        let mut order: Vec<Category> = self.plan.ideal.keys().cloned().collect();
        order.sort_by(|a, b| {
            let pa = self.policies.policy(a).priority;
            let pb = self.policies.policy(b).priority;
            pa.cmp(&pb)
                .then_with(|| self.is_over_budget(b).cmp(&self.is_over_budget(a)))
                .then_with(|| {
                    self.ideal(b)
                        .partial_cmp(&self.ideal(a))
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.cmp(b))
        });
        order
    }

    /// Minimum a category should get in the first pass
    pub fn min_required(&self, category: &Category) -> f64 {
        let policy = self.policies.policy(category);
        let min_budget = policy.min_budget(self.plan.income);
        let spend = self.spend(category);

        if self.is_over_budget(category) {
            (spend * self.config.over_budget_factor).max(min_budget)
        } else if policy.essential {
            spend.max(min_budget)
        } else {
            (spend * self.config.discretionary_spend_floor)
                .max(min_budget * self.config.discretionary_min_floor)
        }
    }

    /// First pass: fund minimums in priority order
    ///
    /// Returns the allocation and the funds left over.
    pub fn guarantee_minimums(&self, order: &[Category]) -> (BudgetMap, f64) {
        let mut remaining = self.plan.available_for_budgets;
        let mut allocated = BudgetMap::new();

        for category in order {
            let ideal = self.ideal(category);
            let required = self.min_required(category);

            let amount = if remaining >= required {
                ideal
                    .min(required * self.config.first_pass_cap_factor)
                    .min(remaining)
                    .max(0.0)
            } else {
                let share = if self.policies.policy(category).essential {
                    self.config.essential_partial_share
                } else {
                    self.config.discretionary_partial_share
                };
                remaining.max(0.0) * share
            };

            remaining -= amount;
            debug!(
                "First pass: {} gets {:.2} (min {:.2}, {:.2} left)",
                category, amount, required, remaining
            );
            allocated.insert(category.clone(), amount);
        }

        (allocated, remaining.max(0.0))
    }

    /// Second pass: spread leftover funds by first-pass share
    pub fn distribute_surplus(&self, allocated: &BudgetMap, remaining: f64) -> BudgetMap {
        if remaining <= 0.0 || allocated.is_empty() {
            return allocated.clone();
        }

        let total_allocated = total(allocated);
        if total_allocated > 0.0 {
            allocated
                .iter()
                .map(|(c, amount)| {
                    (c.clone(), amount + remaining * (amount / total_allocated))
                })
                .collect()
        } else {
            let each = remaining / allocated.len() as f64;
            allocated
                .iter()
                .map(|(c, amount)| (c.clone(), amount + each))
                .collect()
        }
    }

    /// Hard cap: uniform scale to the available pool
    pub fn enforce_cap(&self, budgets: &BudgetMap) -> BudgetMap {
        let available = self.plan.available_for_budgets;
        let current = total(budgets);
        if current <= available || current <= 0.0 {
            return budgets.clone();
        }

        let factor = available / current;
        debug!("Hard cap: scaling {:.2} by {:.4}", current, factor);
        budgets
            .iter()
            .map(|(c, amount)| (c.clone(), amount * factor))
            .collect()
    }

    /// Raise over-budget categories back to their floor
    pub fn restore_floors(&self, budgets: &BudgetMap) -> BudgetMap {
        budgets
            .iter()
            .map(|(c, amount)| {
                let amount = if self.is_over_budget(c) {
                    amount.max(self.over_budget_floor(c))
                } else {
                    *amount
                };
                (c.clone(), amount)
            })
            .collect()
    }

    /// Clamp every category to its policy ceiling
    ///
    /// An over-budget floor outranks the ceiling.
    pub fn clamp_ceilings(&self, budgets: &BudgetMap) -> BudgetMap {
        budgets
            .iter()
            .map(|(c, amount)| {
                let mut ceiling = self.policies.policy(c).max_budget(self.plan.income);
                if self.is_over_budget(c) {
                    ceiling = ceiling.max(self.over_budget_floor(c));
                }
                (c.clone(), amount.min(ceiling).max(0.0))
            })
            .collect()
    }

    /// Round to cents and apply the emergency scale if needed
    pub fn finalize(&self, budgets: &BudgetMap) -> (BudgetMap, Vec<AllocationDiagnostic>) {
        let mut rounded: BudgetMap = budgets
            .iter()
            .map(|(c, amount)| (c.clone(), round_cents(*amount)))
            .collect();
        let mut diagnostics = Vec::new();

        let limit = self.plan.available_for_budgets * self.config.tolerance;
        let current = total(&rounded);
        if current <= limit + EPSILON {
            return (rounded, diagnostics);
        }

        // Over-budget floors are protected; only the amount above a floor
        // absorbs the scale-down.
        let protected_part = |c: &Category, amount: f64| {
            if self.is_over_budget(c) {
                amount.min(round_cents(self.over_budget_floor(c)))
            } else {
                0.0
            }
        };
        let protected_total: f64 = rounded
            .iter()
            .map(|(c, amount)| protected_part(c, *amount))
            .sum();
        let scalable_total = current - protected_total;

        let factor = if scalable_total > 0.0 {
            ((limit - protected_total) / scalable_total).clamp(0.0, 1.0)
        } else {
            1.0
        };

        if factor < 1.0 {
            warn!(
                "Allocation total {:.2} over limit {:.2}, emergency scale {:.4}",
                current, limit, factor
            );
            for (c, amount) in rounded.iter_mut() {
                let floor = protected_part(c, *amount);
                // Truncate so rounding can't push the total back over
                let scaled = ((*amount - floor) * factor * 100.0).floor() / 100.0;
                *amount = round_cents(floor + scaled.max(0.0));
            }
            diagnostics.push(AllocationDiagnostic::EmergencyScaled { factor });
        }

        let final_total = total(&rounded);
        if final_total > limit + EPSILON {
            warn!(
                "Over-budget floors alone exceed the limit: total {:.2}, limit {:.2}",
                final_total, limit
            );
            diagnostics.push(AllocationDiagnostic::ToleranceExceeded {
                total: final_total,
                limit,
            });
        }

        (rounded, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::recommend::RecommendationGenerator;
    use chrono::NaiveDate;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn plan_for(
        config: &Config,
        income: f64,
        current: &SpendTotals,
        existing: &BudgetMap,
    ) -> IdealPlan {
        RecommendationGenerator::new(&config.policies, &config.engine)
            .ideal_budgets(income, current, existing, as_of())
            .unwrap()
    }

    fn map(entries: &[(Category, f64)]) -> BudgetMap {
        entries.iter().cloned().collect()
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(12.346), 12.35);
        assert_eq!(round_cents(12.344), 12.34);
        assert_eq!(round_cents(0.0), 0.0);
    }

    #[test]
    fn test_fitting_plan_passes_through() {
        let config = Config::embedded().unwrap();
        let current = SpendTotals::new();
        let plan = plan_for(&config, 10000.0, &current, &BudgetMap::new());

        let allocation =
            Redistributor::new(&config.policies, &config.engine, &plan, &current).redistribute();
        assert!(!allocation.redistributed);
        assert_eq!(allocation.budgets[&Category::Groceries], 2000.0);
        assert_eq!(allocation.budgets[&Category::Other], 300.0);
        assert!((allocation.total() - 8100.0).abs() < 0.01);
        assert!(allocation.diagnostics.is_empty());
    }

    #[test]
    fn test_priority_order() {
        let config = Config::embedded().unwrap();
        let current = map(&[(Category::Utilities, 1800.0)]);
        let existing = map(&[(Category::Utilities, 1000.0)]);
        let plan = plan_for(&config, 10000.0, &current, &existing);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let order = r.priority_order();
        assert_eq!(
            order,
            vec![
                // Priority 1: over-budget first
                Category::Utilities,
                Category::Groceries,
                // Priority 2: larger ideal first
                Category::Transport,
                Category::GasFuel,
                Category::Shopping,
                // Priority 4: equal ideals fall back to canonical order
                Category::Restaurants,
                Category::Food,
                Category::Entertainment,
                Category::Other,
            ]
        );
    }

    #[test]
    fn test_min_required_rules() {
        let config = Config::embedded().unwrap();
        let current = map(&[
            (Category::Utilities, 1800.0),
            (Category::Groceries, 1600.0),
            (Category::Entertainment, 500.0),
        ]);
        let existing = map(&[
            (Category::Utilities, 1000.0),
            (Category::Groceries, 2500.0),
            (Category::Entertainment, 1000.0),
        ]);
        let plan = plan_for(&config, 10000.0, &current, &existing);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        // Over budget: max(1800 * 1.05, 1200)
        assert!((r.min_required(&Category::Utilities) - 1890.0).abs() < 1e-6);
        // Essential: max(1600, 1500)
        assert!((r.min_required(&Category::Groceries) - 1600.0).abs() < 1e-6);
        // Discretionary: max(500 * 0.8, 300 * 0.5)
        assert!((r.min_required(&Category::Entertainment) - 400.0).abs() < 1e-6);
        // Discretionary with no spend: half the policy minimum
        assert!((r.min_required(&Category::Other) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_guarantee_minimums_caps_at_multiple_of_minimum() {
        let config = Config::embedded().unwrap();
        let current = map(&[(Category::Utilities, 1800.0)]);
        let existing = map(&[(Category::Utilities, 1000.0)]);
        let plan = plan_for(&config, 10000.0, &current, &existing);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let (first, remaining) = r.guarantee_minimums(&r.priority_order());
        // min(ideal 1890, 1890 * 1.2)
        assert!((first[&Category::Utilities] - 1890.0).abs() < 1e-6);
        // min(ideal 2000, 1500 * 1.2)
        assert!((first[&Category::Groceries] - 1800.0).abs() < 1e-6);
        // min(ideal 300, 150 * 1.2)
        assert!((first[&Category::Other] - 180.0).abs() < 1e-6);
        assert!((total(&first) + remaining - plan.available_for_budgets).abs() < 1e-6);
    }

    #[test]
    fn test_guarantee_minimums_partial_share_when_short() {
        let config = Config::embedded().unwrap();
        // Spent 9500 of 10000: pool falls to the 1000 floor
        let current = map(&[(Category::Shopping, 9500.0)]);
        let existing = map(&[(Category::Shopping, 10000.0)]);
        let plan = plan_for(&config, 10000.0, &current, &existing);
        assert!((plan.available_for_budgets - 1000.0).abs() < 1e-6);

        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);
        let (first, remaining) = r.guarantee_minimums(&r.priority_order());

        // Groceries needs 1500, can't be met: essential takes everything left
        assert!((first[&Category::Groceries] - 1000.0).abs() < 1e-6);
        assert_eq!(first[&Category::Utilities], 0.0);
        assert_eq!(first[&Category::Other], 0.0);
        assert_eq!(remaining, 0.0);
    }

    #[test]
    fn test_discretionary_partial_share_leaves_funds() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 1000.0,
            available_for_budgets: 10.0,
            ideal: map(&[(Category::Entertainment, 30.0), (Category::Other, 30.0)]),
            over_budget: BTreeSet::new(),
        };
        let current = SpendTotals::new();
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        // Both need 15 (half of the 30 minimum); only 10 available
        let (first, remaining) = r.guarantee_minimums(&r.priority_order());
        assert!((first[&Category::Entertainment] - 1.0).abs() < 1e-9);
        assert!((first[&Category::Other] - 0.9).abs() < 1e-9);
        assert!((remaining - 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_distribute_surplus_proportional() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 1000.0,
            available_for_budgets: 400.0,
            ideal: BudgetMap::new(),
            over_budget: BTreeSet::new(),
        };
        let current = SpendTotals::new();
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let allocated = map(&[(Category::Food, 100.0), (Category::Other, 300.0)]);
        let result = r.distribute_surplus(&allocated, 100.0);
        assert!((result[&Category::Food] - 125.0).abs() < 1e-9);
        assert!((result[&Category::Other] - 375.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribute_surplus_equal_when_nothing_allocated() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 1000.0,
            available_for_budgets: 100.0,
            ideal: BudgetMap::new(),
            over_budget: BTreeSet::new(),
        };
        let current = SpendTotals::new();
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let allocated = map(&[(Category::Food, 0.0), (Category::Other, 0.0)]);
        let result = r.distribute_surplus(&allocated, 100.0);
        assert_eq!(result[&Category::Food], 50.0);
        assert_eq!(result[&Category::Other], 50.0);
    }

    #[test]
    fn test_enforce_cap_scales_uniformly() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 1000.0,
            available_for_budgets: 300.0,
            ideal: BudgetMap::new(),
            over_budget: BTreeSet::new(),
        };
        let current = SpendTotals::new();
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let budgets = map(&[(Category::Food, 200.0), (Category::Other, 400.0)]);
        let capped = r.enforce_cap(&budgets);
        assert!((capped[&Category::Food] - 100.0).abs() < 1e-9);
        assert!((capped[&Category::Other] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_outranks_ceiling() {
        let config = Config::embedded().unwrap();
        // Groceries ceiling is 30% of 5000 = 1500; the floor is 1575
        let plan = IdealPlan {
            income: 5000.0,
            available_for_budgets: 3000.0,
            ideal: map(&[(Category::Groceries, 1575.0), (Category::Food, 2000.0)]),
            over_budget: [Category::Groceries].into_iter().collect(),
        };
        let current = map(&[(Category::Groceries, 1500.0)]);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let clamped = r.clamp_ceilings(&r.restore_floors(&map(&[
            (Category::Groceries, 1000.0),
            (Category::Food, 2000.0),
        ])));
        assert!((clamped[&Category::Groceries] - 1575.0).abs() < 1e-6);
        // Food ceiling: 15% of 5000
        assert!((clamped[&Category::Food] - 750.0).abs() < 1e-6);
    }

    #[test]
    fn test_finalize_emergency_scale_protects_floors() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 10000.0,
            available_for_budgets: 1000.0,
            ideal: BudgetMap::new(),
            over_budget: [Category::Utilities].into_iter().collect(),
        };
        let current = map(&[(Category::Utilities, 800.0)]);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        // Utilities at its 840 floor, Food pushes the total to 1240 > 1050
        let (budgets, diagnostics) = r.finalize(&map(&[
            (Category::Utilities, 840.0),
            (Category::Food, 400.0),
        ]));
        assert_eq!(budgets[&Category::Utilities], 840.0);
        assert!((budgets[&Category::Food] - 210.0).abs() < 0.011);
        assert!(total(&budgets) <= 1050.0 + 1e-6);
        assert!(matches!(
            diagnostics.as_slice(),
            [AllocationDiagnostic::EmergencyScaled { .. }]
        ));
    }

    #[test]
    fn test_finalize_scales_only_above_floor() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 10000.0,
            available_for_budgets: 1000.0,
            ideal: BudgetMap::new(),
            over_budget: [Category::Utilities].into_iter().collect(),
        };
        let current = map(&[(Category::Utilities, 800.0)]);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        // 840 of Utilities is floor; 160 + 400 scale by 210 / 560
        let (budgets, _) = r.finalize(&map(&[
            (Category::Utilities, 1000.0),
            (Category::Food, 400.0),
        ]));
        assert_eq!(budgets[&Category::Utilities], 900.0);
        assert_eq!(budgets[&Category::Food], 150.0);
    }

    #[test]
    fn test_finalize_reports_unfixable_excess() {
        let config = Config::embedded().unwrap();
        let plan = IdealPlan {
            income: 10000.0,
            available_for_budgets: 1000.0,
            ideal: BudgetMap::new(),
            over_budget: [Category::Utilities].into_iter().collect(),
        };
        let current = map(&[(Category::Utilities, 2000.0)]);
        let r = Redistributor::new(&config.policies, &config.engine, &plan, &current);

        let (budgets, diagnostics) = r.finalize(&map(&[
            (Category::Utilities, 2100.0),
            (Category::Food, 100.0),
        ]));
        assert_eq!(budgets[&Category::Utilities], 2100.0);
        assert_eq!(budgets[&Category::Food], 0.0);
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, AllocationDiagnostic::ToleranceExceeded { .. })));
    }
}
