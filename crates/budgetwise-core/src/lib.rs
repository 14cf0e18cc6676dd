//! Budgetwise Core Library
//!
//! Budget allocation and forecasting for personal finance:
//! - Category policy table (priority, income shares, essential flag)
//! - Spend aggregation over a ledger snapshot
//! - Ideal budget recommendation and priority-based redistribution
//! - Weighted-trend spending forecast with health and risk labels
//! - Pluggable expense classification with a keyword default
//! - CSV import for ledgers and existing budgets
//!
//! Everything in the engine is a pure function of its inputs. Only config
//! loading and CSV import do I/O, and only when the caller asks.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod import;
pub mod models;
pub mod policy;
pub mod recommend;
pub mod redistribute;
pub mod status;

pub use aggregate::{aggregate, month_start, monthly_history};
pub use classify::{Classification, Classifier, KeywordClassifier, ThresholdClassifier};
pub use config::{default_config_path, Config, EngineConfig};
pub use engine::BudgetEngine;
pub use error::{Error, Result};
pub use forecast::{
    ForecastResult, Forecaster, Health, Recommendation, RecommendationKind, Severity, Trend,
};
pub use import::{parse_budgets, parse_ledger};
pub use models::{BudgetMap, Category, MonthKey, SpendTotals, Transaction};
pub use policy::{CategoryPolicy, PolicyTable};
pub use recommend::{IdealPlan, RecommendationGenerator};
pub use redistribute::{Allocation, AllocationDiagnostic, Redistributor};
pub use status::{
    budget_status, expense_exceeds_budget, spending_summary, CategoryStatus, SpendingSummary,
};
