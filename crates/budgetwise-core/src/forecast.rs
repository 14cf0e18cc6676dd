//! Spending forecast
//!
//! Projects next-period spend per category from trailing monthly history:
//! a linearly weighted average (most recent month weighted highest), nudged
//! by a dampened growth trend and floored against the current month. From
//! the projection it derives a trend label, a health label, the categories
//! at risk of busting their budget and a few plain-language recommendations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{total, BudgetMap, Category, MonthKey, SpendTotals};

/// Direction of predicted spend vs the current month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "Increasing",
            Trend::Stable => "Stable",
            Trend::Decreasing => "Decreasing",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall budget health from predicted savings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Excellent,
    Good,
    NeedsAttention,
    AtRisk,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Excellent => "Excellent",
            Health::Good => "Good",
            Health::NeedsAttention => "Needs Attention",
            Health::AtRisk => "At Risk",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How urgent a recommendation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Worth attention but not urgent
    Attention,
    /// Should be addressed soon
    Warning,
    /// Requires immediate attention
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Attention => "attention",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which rule produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Deficit,
    RiskAreas,
    SpendingDrop,
    NoMargin,
    OnTrack,
}

/// A qualitative recommendation attached to a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Forecast for the next period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub predicted: BudgetMap,
    pub predicted_total: f64,
    pub current_total: f64,
    /// `income - predicted_total`; negative means a deficit
    pub predicted_savings: f64,
    pub trend: Trend,
    pub health: Health,
    /// Predicted spend exceeds a set (non-zero) budget
    pub risk_areas: BTreeSet<Category>,
    pub recommendations: Vec<Recommendation>,
}

/// Linearly weighted average with weights `1..=N`, oldest first
pub fn weighted_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (sum, weights) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weights), (i, v)| {
            let w = (i + 1) as f64;
            (sum + v * w, weights + w)
        });
    sum / weights
}

/// `(last - first) / max(first, 1)`, or `None` with fewer than two points
pub fn growth_rate(values: &[f64]) -> Option<f64> {
    match values {
        [first, .., last] => Some((last - first) / first.max(1.0)),
        _ => None,
    }
}

/// Projects spend from history
pub struct Forecaster<'a> {
    config: &'a EngineConfig,
}

impl<'a> Forecaster<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Predicted next-period spend for one category
    ///
    /// `history` is chronological. With no history the prediction is the
    /// current spend.
    pub fn predict_category(&self, history: &[f64], current: f64) -> f64 {
        if history.is_empty() {
            return current;
        }

        let average = weighted_average(history);
        let predicted = match growth_rate(history) {
            Some(rate) => average * (1.0 + rate * self.config.trend_dampening),
            None => average,
        };

        predicted.max(current * self.config.forecast_floor).max(0.0)
    }

    pub fn trend(&self, predicted_total: f64, current_total: f64) -> Trend {
        if predicted_total > current_total * (1.0 + self.config.trend_band) {
            Trend::Increasing
        } else if predicted_total < current_total * (1.0 - self.config.trend_band) {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    pub fn health(&self, predicted_savings: f64, income: f64) -> Health {
        if predicted_savings > income * self.config.health_excellent_savings {
            Health::Excellent
        } else if predicted_savings > 0.0 {
            Health::Good
        } else if predicted_savings > income * self.config.health_attention_savings {
            Health::NeedsAttention
        } else {
            Health::AtRisk
        }
    }

    /// Run the forecast
    pub fn forecast(
        &self,
        current_spend: &SpendTotals,
        historical: &BTreeMap<MonthKey, SpendTotals>,
        income: f64,
        existing: &BudgetMap,
    ) -> ForecastResult {
        let categories: BTreeSet<&Category> = current_spend
            .keys()
            .chain(historical.values().flat_map(|month| month.keys()))
            .collect();

        let mut predicted = BudgetMap::new();
        for category in categories {
            // BTreeMap iteration is already chronological
            let history: Vec<f64> = historical
                .values()
                .filter_map(|month| month.get(category).copied())
                .collect();
            let current = current_spend.get(category).copied().unwrap_or(0.0);
            let value = self.predict_category(&history, current);
            debug!(
                "Forecast {}: {:.2} from {} months (current {:.2})",
                category,
                value,
                history.len(),
                current
            );
            predicted.insert(category.clone(), value);
        }

        let predicted_total = total(&predicted);
        let current_total = total(current_spend);
        let predicted_savings = income - predicted_total;
        let trend = self.trend(predicted_total, current_total);
        let health = self.health(predicted_savings, income);

        let risk_areas: BTreeSet<Category> = predicted
            .iter()
            .filter(|(category, value)| {
                let limit = existing.get(*category).copied().unwrap_or(0.0);
                limit > 0.0 && **value > limit
            })
            .map(|(category, _)| category.clone())
            .collect();

        let recommendations = recommendations(
            predicted_savings,
            predicted_total,
            current_total,
            trend,
            health,
            &risk_areas,
        );

        ForecastResult {
            predicted,
            predicted_total,
            current_total,
            predicted_savings,
            trend,
            health,
            risk_areas,
            recommendations,
        }
    }
}

/// Rule table turning forecast signals into recommendations
fn recommendations(
    predicted_savings: f64,
    predicted_total: f64,
    current_total: f64,
    trend: Trend,
    health: Health,
    risk_areas: &BTreeSet<Category>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if predicted_savings < 0.0 {
        out.push(Recommendation {
            kind: RecommendationKind::Deficit,
            severity: Severity::Alert,
            title: "Projected deficit".to_string(),
            message: format!(
                "Spending is on track to exceed income by ${:.2}. Cut discretionary categories first.",
                -predicted_savings
            ),
        });
    }

    if !risk_areas.is_empty() {
        let names: Vec<&str> = risk_areas.iter().map(|c| c.as_str()).collect();
        out.push(Recommendation {
            kind: RecommendationKind::RiskAreas,
            severity: Severity::Warning,
            title: "Categories likely to go over budget".to_string(),
            message: format!(
                "Predicted spending exceeds the budget for: {}",
                names.join(", ")
            ),
        });
    }

    if trend == Trend::Decreasing {
        out.push(Recommendation {
            kind: RecommendationKind::SpendingDrop,
            severity: Severity::Info,
            title: "Spending expected to drop".to_string(),
            message: format!(
                "Next period is projected at ${:.2}, down from ${:.2}. Consider moving the difference to savings.",
                predicted_total, current_total
            ),
        });
    }

    if out.is_empty() && !matches!(health, Health::Excellent | Health::Good) {
        out.push(Recommendation {
            kind: RecommendationKind::NoMargin,
            severity: Severity::Attention,
            title: "No savings margin".to_string(),
            message: format!(
                "Projected savings are ${:.2}. Any unplanned expense will put the month in deficit.",
                predicted_savings
            ),
        });
    }

    if out.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::OnTrack,
            severity: Severity::Info,
            title: "On track".to_string(),
            message: "Spending is within income and every budget.".to_string(),
        });
    }

    out
}
