//! Valuation screens over portfolio holdings.

use crate::portfolio::Portfolio;
use crate::provider::MarketDataProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A holding flagged by [`recommend_to_sell`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellCandidate {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_pe: Option<f64>,
    /// Dividend yield in percent (2.5 for 2.5%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield_percent: Option<f64>,
    pub sector: String,
    pub industry: String,
}

/// Flag holdings that look expensive or pay too little.
///
/// # Arguments
///
/// * `pe_threshold` - Highest acceptable trailing P/E
/// * `dividend_yield_threshold` - Lowest acceptable dividend yield, in percent
///
/// A holding is flagged when its trailing P/E is above `pe_threshold` or its
/// dividend yield is below `dividend_yield_threshold`. Metrics the provider
/// does not report never trigger a flag; holdings without company info are
/// skipped.
pub fn recommend_to_sell(
    portfolio: &Portfolio,
    provider: &dyn MarketDataProvider,
    pe_threshold: f64,
    dividend_yield_threshold: f64,
) -> Vec<SellCandidate> {
    portfolio
        .symbols()
        .filter_map(|symbol| {
            let Some(info) = provider.fetch_company_info(symbol) else {
                debug!(symbol, "no company info, skipping screen");
                return None;
            };

            let dividend_yield_percent = info.dividend_yield.map(|y| y * 100.0);
            let expensive = info.trailing_pe.is_some_and(|pe| pe > pe_threshold);
            let low_yield = dividend_yield_percent.is_some_and(|y| y < dividend_yield_threshold);

            (expensive || low_yield).then(|| SellCandidate {
                symbol: symbol.to_string(),
                name: info.name,
                trailing_pe: info.trailing_pe,
                dividend_yield_percent,
                sector: info.sector,
                industry: info.industry,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use crate::types::CompanyInfo;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn company(name: &str, pe: Option<f64>, dividend_yield: Option<f64>) -> CompanyInfo {
        CompanyInfo {
            name: name.to_string(),
            sector: "Technology".to_string(),
            trailing_pe: pe,
            dividend_yield,
            ..Default::default()
        }
    }

    #[test]
    fn test_recommend_to_sell() {
        let closes = [10.0, 11.0, 12.0];
        let provider = StaticProvider::new()
            .with_prices("PRICY", day(1), &closes)
            .with_prices("STINGY", day(1), &closes)
            .with_prices("FINE", day(1), &closes)
            .with_prices("BARE", day(1), &closes)
            .with_prices("NOINFO", day(1), &closes)
            .with_company_info("PRICY", company("Pricy Corp", Some(45.0), Some(0.03)))
            .with_company_info("STINGY", company("Stingy Inc", Some(12.0), Some(0.005)))
            .with_company_info("FINE", company("Fine Co", Some(15.0), Some(0.025)))
            .with_company_info("BARE", company("Bare Ltd", None, None));
        let portfolio = Portfolio::new(
            &provider,
            &["PRICY", "STINGY", "FINE", "BARE", "NOINFO"],
            day(1),
            day(31),
            None,
        )
        .unwrap();

        let candidates = recommend_to_sell(&portfolio, &provider, 30.0, 1.0);

        let symbols: Vec<_> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["PRICY", "STINGY"]);
        assert_eq!(candidates[0].name, "Pricy Corp");
        assert_abs_diff_eq!(
            candidates[1].dividend_yield_percent.unwrap(),
            0.5,
            epsilon = 1e-12
        );
        assert_eq!(candidates[1].sector, "Technology");
    }
}
