//! Return, risk and optimization analytics.
//!
//! Functions here operate either on plain daily return slices or on a
//! [`Portfolio`](crate::Portfolio). Daily figures are annualized with 252
//! trading days.

pub mod compare;
pub mod optimizer;
pub mod ratios;
pub mod returns;
pub mod risk;
pub mod screening;

pub use crate::types::{Objective, OptimizationResult};
pub use compare::{
    compare_compositions, compare_returns, compare_sharpe_ratios, compare_volatility,
    ComparisonRow, CompositionTable, Weighting,
};
pub use optimizer::{optimize, optimize_table};
pub use ratios::{sharpe_ratio, sharpe_ratio_of, sortino_ratio, sortino_ratio_of};
pub use returns::{
    annualized_covariance, annualized_return, covariance_matrix, cumulative_return,
    portfolio_volatility, returns, volatility,
};
pub use risk::{
    conditional_value_at_risk, maximum_drawdown, maximum_drawdown_percent, risk_report,
    value_at_risk,
};
pub use screening::{recommend_to_sell, SellCandidate};
