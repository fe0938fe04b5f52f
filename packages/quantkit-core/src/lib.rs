//! QuantKit Core - Portfolio return, risk and optimization analytics.
//!
//! This crate provides the analysis layer of the QuantKit toolkit:
//!
//! - **Returns**: simple and logarithmic returns, annualized mean return
//! - **Risk metrics**: covariance-based volatility, VaR, CVaR, max drawdown
//! - **Portfolios**: weighted aggregation of per-instrument returns
//! - **Ratios**: Sharpe and Sortino ratios
//! - **Optimization**: long-only mean-variance weight optimization
//! - **Comparison**: returns, volatility, Sharpe and sector composition across portfolios
//! - **Indicators**: SMA, EMA, RSI, MACD, Bollinger Bands, OBV, stochastic
//!   oscillator, volume-price trend
//!
//! Market data comes from a [`MarketDataProvider`]. The crate ships an
//! in-memory provider and a provider reading CSV files from a directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use quantkit_core::{CsvDirectoryProvider, Objective, Portfolio};
//!
//! let provider = CsvDirectoryProvider::new("data");
//! let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!
//! let portfolio = Portfolio::new(&provider, &["AAPL", "MSFT"], start, end, None).unwrap();
//! println!("Annualized return: {:.4}", portfolio.portfolio_return().unwrap());
//!
//! let result = quantkit_core::optimize(&portfolio, Objective::MinVolatility).unwrap();
//! println!("Weights: {:?}", result.weights);
//! ```

pub mod analysis;
pub mod config;
pub mod indicators;
pub mod persistence;
pub mod portfolio;
pub mod provider;
pub mod types;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

// Re-export commonly used types
pub use types::{
    ApiResponse, Bar, BarSeries, CompanyInfo, DateTable, OptimizationResult, PriceSeries,
    ReturnMethod, ReturnSeries, RiskReport,
};

// Re-export main functionality
pub use analysis::{
    annualized_return, compare_compositions, compare_returns, compare_sharpe_ratios,
    compare_volatility, conditional_value_at_risk, maximum_drawdown, maximum_drawdown_percent,
    optimize, recommend_to_sell, returns, risk_report, sharpe_ratio, sortino_ratio,
    value_at_risk, volatility, Objective, Weighting,
};
pub use config::AnalysisConfig;
pub use persistence::{load_csv, save_csv};
pub use portfolio::{AddPolicy, Portfolio};
pub use provider::{CsvDirectoryProvider, MarketDataProvider, StaticProvider};

/// Error types for quantkit-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Undefined ratio: {0}")]
    UndefinedRatio(String),

    #[error("Fetch failure: {0}")]
    FetchFailure(String),

    #[error("Optimization failed: {0}")]
    Optimization(String),
}

/// Result type for quantkit-core operations.
pub type Result<T> = std::result::Result<T, Error>;
