//! Engine configuration
//!
//! Holds the category policy table and the numeric thresholds used by the
//! recommendation, redistribution and forecast passes.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. The embedded default (compiled into binary) is always parsed first
//! 2. An override file (explicit path, or ~/.config/budgetwise/budgetwise.toml)
//!    is layered on top; it only needs the keys it changes

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Category;
use crate::policy::{CategoryPolicy, PolicyTable};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/budgetwise.toml");

/// Thresholds and factors for the allocation and forecast engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Share of income always left available for budgets, however much was spent
    pub available_floor_percent: f64,
    /// Over-budget categories are funded at least this multiple of their spend
    pub over_budget_factor: f64,
    /// Never recommend less than this multiple of what has already been spent
    pub spend_headroom_factor: f64,
    /// Month length used for month-progress projection
    pub days_per_month: f64,
    /// Below this month progress, spend is too early to extrapolate
    pub early_month_cutoff: f64,
    /// Share of the base budget blended with early-month spend
    pub early_month_base_factor: f64,
    /// First-pass allocation cap as a multiple of the guaranteed minimum
    pub first_pass_cap_factor: f64,
    /// Share of remaining funds an essential category takes when short
    pub essential_partial_share: f64,
    /// Share of remaining funds a discretionary category takes when short
    pub discretionary_partial_share: f64,
    /// Discretionary minimum as a multiple of current spend
    pub discretionary_spend_floor: f64,
    /// Discretionary minimum as a multiple of the policy minimum
    pub discretionary_min_floor: f64,
    /// Allowed slack over available-for-budgets after floor corrections
    pub tolerance: f64,
    /// Fraction of the historical growth rate applied to the forecast
    pub trend_dampening: f64,
    /// Forecast never drops below this multiple of current spend
    pub forecast_floor: f64,
    /// Band around current total that counts as a stable trend
    pub trend_band: f64,
    /// Savings share of income needed for an Excellent health label
    pub health_excellent_savings: f64,
    /// Savings share of income (negative) above which health Needs Attention
    pub health_attention_savings: f64,
    /// Trailing months used for forecasting
    pub history_months: u32,
    /// Minimum confidence to accept a primary classifier's label
    pub classifier_confidence_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            available_floor_percent: 0.10,
            over_budget_factor: 1.05,
            spend_headroom_factor: 1.10,
            days_per_month: 30.0,
            early_month_cutoff: 0.10,
            early_month_base_factor: 0.80,
            first_pass_cap_factor: 1.20,
            essential_partial_share: 1.0,
            discretionary_partial_share: 0.1,
            discretionary_spend_floor: 0.80,
            discretionary_min_floor: 0.50,
            tolerance: 1.05,
            trend_dampening: 0.30,
            forecast_floor: 0.80,
            trend_band: 0.10,
            health_excellent_savings: 0.20,
            health_attention_savings: -0.10,
            history_months: 3,
            classifier_confidence_threshold: 0.70,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.days_per_month <= 0.0 {
            return Err(Error::Config("days_per_month must be positive".into()));
        }
        if self.tolerance < 1.0 {
            return Err(Error::Config("tolerance must be at least 1.0".into()));
        }
        for (name, share) in [
            ("available_floor_percent", self.available_floor_percent),
            ("essential_partial_share", self.essential_partial_share),
            ("discretionary_partial_share", self.discretionary_partial_share),
        ] {
            if !(0.0..=1.0).contains(&share) {
                return Err(Error::Config(format!("{} must be between 0 and 1", name)));
            }
        }
        if self.health_attention_savings > self.health_excellent_savings {
            return Err(Error::Config(
                "health_attention_savings must not exceed health_excellent_savings".into(),
            ));
        }
        Ok(())
    }
}

/// Full configuration: engine thresholds plus the policy table
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub engine: EngineConfig,
    pub policies: PolicyTable,
}

impl Config {
    /// Load config, layering the override file (if any) over the embedded default
    ///
    /// An explicit path must exist; the user override location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let override_content = match path {
            Some(path) => Some(fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?),
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    debug!("Using config override at {}", default_path.display());
                    Some(fs::read_to_string(&default_path)?)
                }
                _ => None,
            },
        };

        let mut raw = parse_raw(DEFAULT_CONFIG)?;
        if let Some(content) = override_content {
            raw.merge(parse_raw(&content)?);
        }
        raw.build()
    }

    /// Parse a complete config from TOML, with no embedded defaults underneath
    /// except the engine thresholds and fallback policy
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_raw(content)?.build()
    }

    /// The embedded default configuration
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::embedded().unwrap_or_else(|_| Self {
            engine: EngineConfig::default(),
            policies: PolicyTable::fallback(),
        })
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("budgetwise").join("budgetwise.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    engine: Option<toml::Table>,
    default_policy: Option<RawPolicy>,
    categories: Option<BTreeMap<String, RawPolicy>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct RawPolicy {
    priority: Option<u32>,
    base_percent: Option<f64>,
    min_percent: Option<f64>,
    max_percent: Option<f64>,
    essential: Option<bool>,
}

impl RawPolicy {
    fn merge(&mut self, other: RawPolicy) {
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.base_percent.is_some() {
            self.base_percent = other.base_percent;
        }
        if other.min_percent.is_some() {
            self.min_percent = other.min_percent;
        }
        if other.max_percent.is_some() {
            self.max_percent = other.max_percent;
        }
        if other.essential.is_some() {
            self.essential = other.essential;
        }
    }

    fn resolve(&self, base: &CategoryPolicy) -> CategoryPolicy {
        CategoryPolicy {
            priority: self.priority.unwrap_or(base.priority),
            base_percent: self.base_percent.unwrap_or(base.base_percent),
            min_percent: self.min_percent.unwrap_or(base.min_percent),
            max_percent: self.max_percent.unwrap_or(base.max_percent),
            essential: self.essential.unwrap_or(base.essential),
        }
    }
}

impl RawConfig {
    fn merge(&mut self, other: RawConfig) {
        if let Some(engine) = other.engine {
            self.engine.get_or_insert_with(toml::Table::new).extend(engine);
        }
        if let Some(default_policy) = other.default_policy {
            self.default_policy
                .get_or_insert_with(RawPolicy::default)
                .merge(default_policy);
        }
        if let Some(categories) = other.categories {
            let ours = self.categories.get_or_insert_with(BTreeMap::new);
            for (name, policy) in categories {
                ours.entry(name).or_default().merge(policy);
            }
        }
    }

    fn build(self) -> Result<Config> {
        let engine: EngineConfig = match self.engine {
            Some(table) => toml::Value::Table(table).try_into()?,
            None => EngineConfig::default(),
        };
        engine.validate()?;

        let default_policy = self
            .default_policy
            .map(|p| p.resolve(&CategoryPolicy::FALLBACK))
            .unwrap_or_default();

        let mut policies = BTreeMap::new();
        for (name, raw) in self.categories.unwrap_or_default() {
            let category = Category::parse(&name);
            policies.insert(category, raw.resolve(&default_policy));
        }

        Ok(Config {
            engine,
            policies: PolicyTable::new(policies, default_policy)?,
        })
    }
}

fn parse_raw(content: &str) -> Result<RawConfig> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = Config::embedded().unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.policies.len(), Category::all().len());

        let groceries = config.policies.policy(&Category::Groceries);
        assert_eq!(groceries.priority, 1);
        assert!(groceries.essential);
        assert!((groceries.base_percent - 0.20).abs() < 1e-9);

        let utilities = config.policies.policy(&Category::Utilities);
        assert!((utilities.min_percent - 0.12).abs() < 1e-9);

        let gas = config.policies.policy(&Category::GasFuel);
        assert!((gas.base_percent - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_every_builtin_category_configured() {
        let config = Config::embedded().unwrap();
        for cat in Category::all() {
            assert!(config.policies.contains(cat), "missing {}", cat);
        }
    }

    #[test]
    fn test_override_file_layers_over_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[engine]
tolerance = 1.10

[categories.Food]
max_percent = 0.20

[categories.Pets]
priority = 3
essential = true
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!((config.engine.tolerance - 1.10).abs() < 1e-9);
        // Untouched keys keep their defaults
        assert!((config.engine.over_budget_factor - 1.05).abs() < 1e-9);

        let food = config.policies.policy(&Category::Food);
        assert!((food.max_percent - 0.20).abs() < 1e-9);
        assert!((food.min_percent - 0.03).abs() < 1e-9);

        let pets = config.policies.policy(&Category::Custom("Pets".into()));
        assert_eq!(pets.priority, 3);
        assert!(pets.essential);
        // Unspecified percentages come from the default policy
        assert!((pets.base_percent - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/budgetwise.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let result = Config::from_toml(
            r#"
[categories.Groceries]
priority = 1
base_percent = 0.5
min_percent = 0.6
max_percent = 0.7
essential = true
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            Config::from_toml("[engine\n"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_invalid_engine_value_rejected() {
        let result = Config::from_toml("[engine]\ndays_per_month = 0.0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
