//! Portfolio aggregation module.
//!
//! Holds weighted instruments, builds the per-date return table and derives
//! portfolio-level return and volatility.

mod holdings;

pub use holdings::{AddPolicy, Portfolio};
