//! Budget engine facade
//!
//! Owns a loaded [`Config`] and exposes the three engine operations
//! (aggregate, recommend, forecast) over caller-supplied snapshots. The
//! engine holds no mutable state; one instance can be shared across threads.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::aggregate::{self, month_start};
use crate::classify::{Classifier, KeywordClassifier, ThresholdClassifier};
use crate::config::{Config, EngineConfig};
use crate::error::Result;
use crate::forecast::{ForecastResult, Forecaster};
use crate::models::{BudgetMap, MonthKey, SpendTotals, Transaction};
use crate::policy::PolicyTable;
use crate::recommend::RecommendationGenerator;
use crate::redistribute::{Allocation, Redistributor};

#[derive(Debug, Clone, Default)]
pub struct BudgetEngine {
    config: Config,
}

impl BudgetEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.config.policies
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.config.engine
    }

    /// Per-category spend for `date >= window_start` (all time when `None`)
    pub fn aggregate(
        &self,
        transactions: &[Transaction],
        window_start: Option<NaiveDate>,
    ) -> SpendTotals {
        aggregate::aggregate(transactions, window_start, &self.config.policies)
    }

    /// Spend in the month containing `as_of`, up to and including `as_of`
    pub fn current_month_spend(&self, transactions: &[Transaction], as_of: NaiveDate) -> SpendTotals {
        let in_month: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| tx.date <= as_of)
            .cloned()
            .collect();
        self.aggregate(&in_month, Some(month_start(as_of)))
    }

    /// The configured number of complete months before `as_of`'s month
    pub fn history(
        &self,
        transactions: &[Transaction],
        as_of: NaiveDate,
    ) -> BTreeMap<MonthKey, SpendTotals> {
        aggregate::monthly_history(transactions, as_of, self.config.engine.history_months)
    }

    /// Recommended monthly limits for every category
    ///
    /// Non-positive income yields an empty allocation.
    pub fn recommend(
        &self,
        income: f64,
        current_spend: &SpendTotals,
        existing: &BudgetMap,
        as_of: NaiveDate,
    ) -> Allocation {
        let generator = RecommendationGenerator::new(&self.config.policies, &self.config.engine);
        let Some(plan) = generator.ideal_budgets(income, current_spend, existing, as_of) else {
            warn!("Income must be positive to recommend budgets (got {})", income);
            return Allocation::empty();
        };

        let allocation =
            Redistributor::new(&self.config.policies, &self.config.engine, &plan, current_spend)
                .redistribute();

        info!(
            "Recommended {:.2} across {} categories ({:.2} available{})",
            allocation.total(),
            allocation.budgets.len(),
            allocation.available_for_budgets,
            if allocation.redistributed {
                ", redistributed"
            } else {
                ""
            }
        );

        allocation
    }

    /// Predict next-period spend from trailing history
    pub fn forecast(
        &self,
        current_spend: &SpendTotals,
        historical: &BTreeMap<MonthKey, SpendTotals>,
        income: f64,
        existing: &BudgetMap,
    ) -> ForecastResult {
        let result =
            Forecaster::new(&self.config.engine).forecast(current_spend, historical, income, existing);
        info!(
            "Forecast {:.2} next period ({}, {}), {} risk area(s)",
            result.predicted_total,
            result.trend,
            result.health,
            result.risk_areas.len()
        );
        result
    }

    /// The built-in keyword classifier
    pub fn keyword_classifier(&self) -> Result<KeywordClassifier> {
        KeywordClassifier::new()
    }

    /// Gate `primary` on the configured confidence threshold, falling back to
    /// the keyword rules
    pub fn classifier_with<P: Classifier>(
        &self,
        primary: P,
    ) -> Result<ThresholdClassifier<P, KeywordClassifier>> {
        Ok(ThresholdClassifier::with_threshold(
            primary,
            KeywordClassifier::new()?,
            self.config.engine.classifier_confidence_threshold,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::models::Category;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn engine() -> BudgetEngine {
        BudgetEngine::new(Config::embedded().unwrap())
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BudgetEngine>();
    }

    #[test]
    fn test_recommend_zero_income_is_empty() {
        let allocation = engine().recommend(
            0.0,
            &SpendTotals::new(),
            &BudgetMap::new(),
            date(3, 15),
        );
        assert!(allocation.is_empty());
        assert!(allocation.diagnostics.is_empty());
    }

    #[test]
    fn test_current_month_spend_bounds() {
        let txs = vec![
            Transaction::new(date(2, 28), 100.0, Category::Food),
            Transaction::new(date(3, 1), 10.0, Category::Food),
            Transaction::new(date(3, 15), 20.0, Category::Food),
            Transaction::new(date(3, 20), 40.0, Category::Food),
        ];
        let spend = engine().current_month_spend(&txs, date(3, 15));
        assert_eq!(spend[&Category::Food], 30.0);
        assert_eq!(spend[&Category::Groceries], 0.0);
    }

    #[test]
    fn test_history_uses_configured_months() {
        let history = engine().history(&[], date(3, 15));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_classifier_uses_configured_threshold() {
        struct Unsure;
        impl Classifier for Unsure {
            fn predict(&self, _text: &str) -> Option<Classification> {
                Some(Classification::new(Category::Shopping, 0.69))
            }
        }

        let engine = engine();
        let classifier = engine.classifier_with(Unsure).unwrap();
        assert_eq!(classifier.threshold(), 0.70);
        assert_eq!(classifier.classify("taxi").category, Category::Transport);
    }
}
