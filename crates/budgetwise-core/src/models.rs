//! Data models for Budgetwise

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Spending category
///
/// The closed set of categories the policy table knows about, plus `Custom`
/// for labels an upstream classifier or ledger produced that we don't
/// recognise. Custom categories resolve to the default policy.
///
/// Variant order is the canonical display order and the final tie-break
/// when ordering categories for redistribution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Groceries,
    Utilities,
    Transport,
    GasFuel,
    Shopping,
    Restaurants,
    Food,
    Entertainment,
    Other,
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Groceries => "Groceries",
            Category::Utilities => "Utilities",
            Category::Transport => "Transport",
            Category::GasFuel => "Gas & Fuel",
            Category::Shopping => "Shopping",
            Category::Restaurants => "Restaurants",
            Category::Food => "Food",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
            Category::Custom(label) => label,
        }
    }

    /// All built-in categories in canonical order
    pub fn all() -> &'static [Category] {
        &[
            Category::Groceries,
            Category::Utilities,
            Category::Transport,
            Category::GasFuel,
            Category::Shopping,
            Category::Restaurants,
            Category::Food,
            Category::Entertainment,
            Category::Other,
        ]
    }

    /// Resolve a free-form label. Matching is case-insensitive and accepts a
    /// few common aliases ("Bills", "Gas", "Dining"). Blank labels become
    /// `Other`; anything else unrecognised becomes `Custom`.
    pub fn parse(label: &str) -> Category {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "other" => Category::Other,
            "groceries" | "grocery" => Category::Groceries,
            "utilities" | "bills" => Category::Utilities,
            "transport" | "transportation" => Category::Transport,
            "gas & fuel" | "gas and fuel" | "gas" | "fuel" => Category::GasFuel,
            "shopping" => Category::Shopping,
            "restaurants" | "restaurant" | "dining" => Category::Restaurants,
            "food" => Category::Food,
            "entertainment" => Category::Entertainment,
            _ => Category::Custom(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::parse(s))
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::parse(s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

/// A recorded expense, already categorized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: f64, category: impl Into<Category>) -> Self {
        Self {
            date,
            amount,
            category: category.into(),
            description: None,
        }
    }
}

/// Per-category spend over some window
pub type SpendTotals = BTreeMap<Category, f64>;

/// Per-category monthly limits (existing budgets, ideal budgets, allocations)
pub type BudgetMap = BTreeMap<Category, f64>;

/// Sum every value in a category mapping
pub fn total(map: &BTreeMap<Category, f64>) -> f64 {
    map.values().sum()
}

/// Calendar month used to key historical spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in month key: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in month key: {}", s))?;
        MonthKey::new(year, month).ok_or_else(|| format!("Month out of range: {}", s))
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MonthKey> for String {
    fn from(m: MonthKey) -> Self {
        m.to_string()
    }
}
