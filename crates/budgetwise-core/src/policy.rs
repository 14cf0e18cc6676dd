//! Category policy table
//!
//! Each category carries a priority tier, three income shares (minimum,
//! baseline, maximum) and an essential flag. The table is built once from
//! configuration and shared immutably; lookups never fail because unknown
//! categories resolve to the default policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::Category;

/// Budget policy for a single category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    /// Redistribution tier (1 = served first)
    pub priority: u32,
    /// Share of income budgeted when there is no spend data
    pub base_percent: f64,
    /// Lowest share of income this category should get
    pub min_percent: f64,
    /// Ceiling on this category's share of income
    pub max_percent: f64,
    /// Non-discretionary spending
    pub essential: bool,
}

impl CategoryPolicy {
    /// Low-priority, non-essential policy used when the config doesn't provide one
    pub const FALLBACK: CategoryPolicy = CategoryPolicy {
        priority: 6,
        base_percent: 0.03,
        min_percent: 0.01,
        max_percent: 0.05,
        essential: false,
    };

    pub fn min_budget(&self, income: f64) -> f64 {
        income * self.min_percent
    }

    pub fn base_budget(&self, income: f64) -> f64 {
        income * self.base_percent
    }

    pub fn max_budget(&self, income: f64) -> f64 {
        income * self.max_percent
    }

    /// Check `0 <= min <= base <= max <= 1` and `priority >= 1`
    pub fn validate(&self, label: &str) -> Result<()> {
        let in_range = |p: f64| (0.0..=1.0).contains(&p);

        if !(in_range(self.min_percent) && in_range(self.base_percent) && in_range(self.max_percent))
        {
            return Err(Error::Config(format!(
                "{}: percentages must be between 0 and 1",
                label
            )));
        }
        if self.min_percent > self.base_percent || self.base_percent > self.max_percent {
            return Err(Error::Config(format!(
                "{}: expected min_percent <= base_percent <= max_percent (got {} / {} / {})",
                label, self.min_percent, self.base_percent, self.max_percent
            )));
        }
        if self.priority == 0 {
            return Err(Error::Config(format!("{}: priority starts at 1", label)));
        }
        Ok(())
    }
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Lookup table from category to policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyTable {
    policies: BTreeMap<Category, CategoryPolicy>,
    default_policy: CategoryPolicy,
}

impl PolicyTable {
    /// Build a validated table
    pub fn new(
        policies: BTreeMap<Category, CategoryPolicy>,
        default_policy: CategoryPolicy,
    ) -> Result<Self> {
        default_policy.validate("default_policy")?;
        for (category, policy) in &policies {
            policy.validate(category.as_str())?;
        }
        Ok(Self {
            policies,
            default_policy,
        })
    }

    /// Empty table where every category gets the fallback policy
    pub fn fallback() -> Self {
        Self {
            policies: BTreeMap::new(),
            default_policy: CategoryPolicy::FALLBACK,
        }
    }

    /// Policy for a category, or the default policy when it isn't listed
    pub fn policy(&self, category: &Category) -> &CategoryPolicy {
        self.policies.get(category).unwrap_or(&self.default_policy)
    }

    pub fn default_policy(&self) -> &CategoryPolicy {
        &self.default_policy
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.policies.contains_key(category)
    }

    /// Configured categories in canonical order
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.policies.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &CategoryPolicy)> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
