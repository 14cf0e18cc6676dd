//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, ledger and budget loading, JSON output)
//! - `policy` - Policy table display
//! - `spending` - Spend aggregation and budget status
//! - `recommend` - Budget recommendations
//! - `forecast` - Spending forecast
//! - `classify` - Description classification

pub mod classify;
pub mod core;
pub mod forecast;
pub mod policy;
pub mod recommend;
pub mod spending;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use forecast::*;
pub use policy::*;
pub use recommend::*;
pub use spending::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
