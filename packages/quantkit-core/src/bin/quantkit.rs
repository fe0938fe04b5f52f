//! QuantKit CLI - portfolio return, risk and optimization reports.
//!
//! Every command prints a JSON `ApiResponse` on stdout. Logs go to stderr and
//! are filtered with `RUST_LOG`.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use quantkit_core::analysis::{
    compare_compositions, compare_returns, compare_sharpe_ratios, compare_volatility, optimize,
    recommend_to_sell, sharpe_ratio, sortino_ratio, Weighting,
};
use quantkit_core::indicators::{
    bollinger_bands, ema, macd, obv, rsi, sma, stochastic_oscillator, vpt,
};
use quantkit_core::{
    annualized_return, maximum_drawdown, returns, save_csv, volatility, AnalysisConfig,
    ApiResponse, CsvDirectoryProvider, DateTable, MarketDataProvider, Objective, Portfolio,
    ReturnMethod,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quantkit")]
#[command(about = "QuantKit CLI - portfolio returns, risk and optimization")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.quantkit/config.toml or $QUANTKIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory with <SYMBOL>.csv price files and companies.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Window {
    /// First day of the window (YYYY-MM-DD, inclusive)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End of the window (YYYY-MM-DD, exclusive)
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Args)]
struct Holdings {
    /// Symbols (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    symbols: Vec<String>,
    /// Weights aligned with the symbols (comma-separated); equal weights if omitted
    #[arg(short, long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,
    /// Return calculation method
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
    #[command(flatten)]
    window: Window,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Simple,
    Log,
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    /// Maximize the Sharpe ratio
    Sharpe,
    /// Minimize volatility
    Volatility,
}

#[derive(Clone, Copy, ValueEnum)]
enum WeightingArg {
    Sum,
    Portfolio,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-instrument and portfolio returns, volatility and ratios
    Returns {
        #[command(flatten)]
        holdings: Holdings,
    },
    /// VaR, CVaR, drawdown and ratios of the weighted portfolio
    Risk {
        #[command(flatten)]
        holdings: Holdings,
        /// Confidence level for VaR (0.95 = 95%)
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Optimize weights
    Optimize {
        #[command(flatten)]
        holdings: Holdings,
        #[arg(long, value_enum, default_value = "sharpe")]
        objective: ObjectiveArg,
    },
    /// Compare several portfolios
    Compare {
        /// One portfolio per flag, symbols comma-separated (repeatable)
        #[arg(short, long = "portfolio", required = true)]
        portfolios: Vec<String>,
        #[arg(long, value_enum, default_value = "sum")]
        weighting: WeightingArg,
        #[command(flatten)]
        window: Window,
    },
    /// Flag holdings with a high P/E or a low dividend yield
    Screen {
        #[command(flatten)]
        holdings: Holdings,
        /// Highest acceptable trailing P/E
        #[arg(long, default_value = "30")]
        pe: f64,
        /// Lowest acceptable dividend yield in percent
        #[arg(long, default_value = "1")]
        dividend_yield: f64,
    },
    /// Write the per-date return table (or normalized prices) to CSV
    Export {
        #[command(flatten)]
        holdings: Holdings,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
        /// Export prices divided by their first value instead of returns
        #[arg(long)]
        normalized_prices: bool,
    },
    /// Technical indicators over one symbol's closing prices
    Indicators {
        /// Stock symbol
        #[arg(short, long)]
        symbol: String,
        /// Window for SMA, RSI, Bollinger Bands and the stochastic %K
        #[arg(long, default_value = "14")]
        window: usize,
        #[command(flatten)]
        range: Window,
    },
}

struct Context {
    config: AnalysisConfig,
    provider: CsvDirectoryProvider,
}

impl Context {
    fn load(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> quantkit_core::Result<Self> {
        let path = config.unwrap_or_else(AnalysisConfig::default_path);
        let mut config = AnalysisConfig::load_from(&path)?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        debug!(data_dir = %config.data_dir.display(), "using market data directory");
        let provider = CsvDirectoryProvider::new(&config.data_dir);
        Ok(Self { config, provider })
    }

    fn window(&self, window: &Window) -> (NaiveDate, NaiveDate) {
        (
            window.start.unwrap_or(self.config.start_date),
            window.end.unwrap_or(self.config.end_date),
        )
    }

    fn portfolio(&self, holdings: &Holdings) -> quantkit_core::Result<Portfolio> {
        let (start, end) = self.window(&holdings.window);
        let weights = match &holdings.weights {
            Some(weights) if weights.len() != holdings.symbols.len() => {
                return Err(quantkit_core::Error::InvalidInput(format!(
                    "{} weights for {} symbols",
                    weights.len(),
                    holdings.symbols.len()
                )));
            }
            Some(weights) => Some(
                holdings
                    .symbols
                    .iter()
                    .cloned()
                    .zip(weights.iter().copied())
                    .collect::<BTreeMap<_, _>>(),
            ),
            None => None,
        };
        let method = match holdings.method {
            Some(MethodArg::Simple) => ReturnMethod::Simple,
            Some(MethodArg::Log) => ReturnMethod::Log,
            None => self.config.return_method,
        };

        Ok(
            Portfolio::new(&self.provider, holdings.symbols.as_slice(), start, end, weights)?
                .with_return_method(method)
                .with_add_policy(self.config.add_policy),
        )
    }
}

fn handle_returns(ctx: &Context, holdings: Holdings) -> quantkit_core::Result<Value> {
    let portfolio = ctx.portfolio(&holdings)?;
    let rf = ctx.config.risk_free_rate;

    let mut instruments = BTreeMap::new();
    for symbol in portfolio.symbols() {
        if let Some(prices) = portfolio.prices(symbol) {
            let series = returns(prices, portfolio.return_method())?.values();
            instruments.insert(
                symbol.to_string(),
                json!({
                    "weight": portfolio.weights().get(symbol),
                    "annualized_return": annualized_return(&series)?,
                    "volatility": volatility(&series).ok(),
                    "max_drawdown": maximum_drawdown(&prices.values()).ok(),
                }),
            );
        }
    }

    Ok(json!({
        "portfolio": portfolio.name(),
        "instruments": instruments,
        "observations": portfolio.returns_table()?.n_rows(),
        "portfolio_return": portfolio.portfolio_return()?,
        "portfolio_volatility": portfolio.portfolio_volatility()?,
        "sharpe_ratio": sharpe_ratio(&portfolio, rf).ok(),
        "sortino_ratio": sortino_ratio(&portfolio, rf).ok(),
    }))
}

fn handle_risk(
    ctx: &Context,
    holdings: Holdings,
    confidence: Option<f64>,
) -> quantkit_core::Result<Value> {
    let portfolio = ctx.portfolio(&holdings)?;
    let confidence = confidence.unwrap_or(ctx.config.confidence);
    let report = portfolio.risk_report(confidence, ctx.config.risk_free_rate)?;

    Ok(json!({
        "portfolio": portfolio.name(),
        "weights": portfolio.weights(),
        "risk": report,
    }))
}

fn handle_optimize(
    ctx: &Context,
    holdings: Holdings,
    objective: ObjectiveArg,
) -> quantkit_core::Result<Value> {
    let mut portfolio = ctx.portfolio(&holdings)?;
    let objective = match objective {
        ObjectiveArg::Sharpe => Objective::MaxSharpe {
            risk_free_rate: ctx.config.risk_free_rate,
        },
        ObjectiveArg::Volatility => Objective::MinVolatility,
    };

    let before = json!({
        "weights": portfolio.weights(),
        "portfolio_return": portfolio.portfolio_return()?,
        "portfolio_volatility": portfolio.portfolio_volatility()?,
    });
    let result = optimize(&portfolio, objective)?;
    portfolio.apply_optimization(&result)?;

    Ok(json!({
        "portfolio": portfolio.name(),
        "before": before,
        "result": result,
        "portfolio_return": portfolio.portfolio_return()?,
        "portfolio_volatility": portfolio.portfolio_volatility()?,
        "sharpe_ratio": sharpe_ratio(&portfolio, ctx.config.risk_free_rate).ok(),
    }))
}

fn handle_compare(
    ctx: &Context,
    portfolios: Vec<String>,
    weighting: WeightingArg,
    window: Window,
) -> quantkit_core::Result<Value> {
    let (start, end) = ctx.window(&window);
    let weighting = match weighting {
        WeightingArg::Sum => Weighting::Sum,
        WeightingArg::Portfolio => Weighting::Portfolio,
    };

    let built = portfolios
        .iter()
        .map(|list| {
            let symbols: Vec<&str> = list.split(',').map(str::trim).collect();
            Portfolio::new(&ctx.provider, symbols.as_slice(), start, end, None)
        })
        .collect::<quantkit_core::Result<Vec<_>>>()?;
    let refs: Vec<&Portfolio> = built.iter().collect();
    let provider: &dyn MarketDataProvider = &ctx.provider;

    Ok(json!({
        "weighting": match weighting {
            Weighting::Sum => "sum",
            Weighting::Portfolio => "portfolio",
        },
        "cumulative_returns": compare_returns(&refs, provider, start, end, weighting)?,
        "volatility": compare_volatility(&refs, provider, start, end, weighting)?,
        "sharpe_ratios": compare_sharpe_ratios(
            &refs,
            provider,
            start,
            end,
            weighting,
            ctx.config.risk_free_rate,
        )?,
        "compositions": compare_compositions(&refs, provider),
    }))
}

fn handle_screen(
    ctx: &Context,
    holdings: Holdings,
    pe: f64,
    dividend_yield: f64,
) -> quantkit_core::Result<Value> {
    let portfolio = ctx.portfolio(&holdings)?;
    let candidates = recommend_to_sell(&portfolio, &ctx.provider, pe, dividend_yield);
    Ok(json!({
        "portfolio": portfolio.name(),
        "candidates": candidates,
    }))
}

fn handle_export(
    ctx: &Context,
    holdings: Holdings,
    output: PathBuf,
    normalized_prices: bool,
) -> quantkit_core::Result<Value> {
    let portfolio = ctx.portfolio(&holdings)?;

    let table = if normalized_prices {
        let series: Vec<_> = portfolio
            .symbols()
            .filter_map(|s| portfolio.prices(s))
            .collect();
        let index = series.first().map(|s| s.dates()).unwrap_or_default();
        let columns = series.iter().map(|s| s.symbol.clone()).collect();
        let lookups: Vec<BTreeMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| s.points().iter().copied().collect())
            .collect();
        let rows = index
            .iter()
            .map(|date| {
                lookups
                    .iter()
                    .map(|m| m.get(date).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        DateTable::new(index, columns, rows)?.normalize()?
    } else {
        portfolio.returns_table()?.clone()
    };

    save_csv(&table, &output)?;
    Ok(json!({
        "path": output,
        "rows": table.n_rows(),
        "columns": table.columns(),
    }))
}

fn handle_indicators(
    ctx: &Context,
    symbol: String,
    window: usize,
    range: Window,
) -> quantkit_core::Result<Value> {
    let (start, end) = ctx.window(&range);
    let prices = ctx.provider.fetch_history(&symbol, start, end);
    if prices.is_empty() {
        return Err(quantkit_core::Error::FetchFailure(format!(
            "no price history for {}",
            symbol
        )));
    }
    let closes = prices.values();

    let mut report = json!({
        "symbol": prices.symbol,
        "dates": prices.dates(),
        "close": closes,
        "sma": sma(&closes, window),
        "ema": ema(&closes, window),
        "rsi": rsi(&closes, window),
        "macd": macd(&closes, 12, 26, 9),
        "bollinger_bands": bollinger_bands(&closes, window, 2.0),
    });

    // Volume and high/low indicators need full bars, which plain close files lack
    let bars = ctx.provider.fetch_bars(&symbol, start, end);
    if bars.is_empty() {
        debug!(symbol = %symbol, "no bars, skipping volume indicators");
    } else {
        let (highs, lows, bar_closes, volumes) =
            (bars.highs(), bars.lows(), bars.closes(), bars.volumes());
        report["bars"] = json!({
            "dates": bars.dates(),
            "obv": obv(&bar_closes, &volumes),
            "vpt": vpt(&bar_closes, &volumes),
            "stochastic": stochastic_oscillator(&highs, &lows, &bar_closes, window, 3),
        });
    }

    Ok(report)
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quantkit=info,quantkit_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = Context::load(cli.config, cli.data_dir).and_then(|ctx| match cli.command {
        Commands::Returns { holdings } => handle_returns(&ctx, holdings),
        Commands::Risk {
            holdings,
            confidence,
        } => handle_risk(&ctx, holdings, confidence),
        Commands::Optimize {
            holdings,
            objective,
        } => handle_optimize(&ctx, holdings, objective),
        Commands::Compare {
            portfolios,
            weighting,
            window,
        } => handle_compare(&ctx, portfolios, weighting, window),
        Commands::Screen {
            holdings,
            pe,
            dividend_yield,
        } => handle_screen(&ctx, holdings, pe, dividend_yield),
        Commands::Export {
            holdings,
            output,
            normalized_prices,
        } => handle_export(&ctx, holdings, output, normalized_prices),
        Commands::Indicators {
            symbol,
            window,
            range,
        } => handle_indicators(&ctx, symbol, window, range),
    });

    let output = match result {
        Ok(data) => serde_json::to_string_pretty(&ApiResponse::ok(data))?,
        Err(e) => serde_json::to_string_pretty(&ApiResponse::<()>::err(e.to_string()))?,
    };
    println!("{}", output);
    Ok(())
}
