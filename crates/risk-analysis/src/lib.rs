use std::collections::{BTreeMap, HashMap};

use analysis_core::{stats, AnalysisError, FundamentalsRecord, PriceBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Bars averaged for liquidity figures
const LIQUIDITY_WINDOW: usize = 30;
/// Aligned return observations needed before peer correlation is reported
pub const MIN_CORRELATION_OBSERVATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRisk {
    /// Sample standard deviation of daily returns (fraction)
    pub daily_volatility: f64,
    /// Annualized, percent
    pub annual_volatility: f64,
    /// 5th percentile daily return, percent
    pub var_95: f64,
    /// 1st percentile daily return, percent
    pub var_99: f64,
}

/// Drawdowns from the running peak, in percent (all values ≤ 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownRisk {
    pub current_drawdown: f64,
    pub max_drawdown: f64,
    /// Mean of the strictly negative drawdowns, 0 when there were none
    pub avg_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRisk {
    /// As reported in the fundamentals snapshot; no regression is run here
    pub beta: f64,
    /// Correlation of daily returns with the equal-weighted peer basket.
    /// `None` when peer histories are unavailable or too short.
    pub correlation_vs_peers: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRisk {
    pub avg_daily_volume: f64,
    pub dollar_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub volatility: VolatilityRisk,
    pub drawdowns: DrawdownRisk,
    pub market_risk: MarketRisk,
    pub liquidity: LiquidityRisk,
}

/// Close-to-close returns; the first bar has no prior close and is skipped,
/// as is any bar whose prior close is zero.
pub fn daily_returns(bars: &[PriceBar]) -> Vec<f64> {
    dated_returns(bars).into_values().collect()
}

fn dated_returns(bars: &[PriceBar]) -> BTreeMap<NaiveDate, f64> {
    bars.windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].date, w[1].close / w[0].close - 1.0))
        .collect()
}

/// Percent drawdown from the running maximum close at every bar
pub fn drawdown_series(closes: &[f64]) -> Vec<f64> {
    let mut running_max = f64::NEG_INFINITY;
    closes
        .iter()
        .map(|&price| {
            running_max = running_max.max(price);
            if running_max > 0.0 {
                (price / running_max - 1.0) * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn volatility_risk(returns: &[f64]) -> VolatilityRisk {
    let daily = stats::std_dev(returns);
    VolatilityRisk {
        daily_volatility: daily,
        annual_volatility: daily * TRADING_DAYS_PER_YEAR.sqrt() * 100.0,
        var_95: stats::percentile(returns, 5.0) * 100.0,
        var_99: stats::percentile(returns, 1.0) * 100.0,
    }
}

pub fn drawdown_risk(closes: &[f64]) -> DrawdownRisk {
    let drawdowns = drawdown_series(closes);
    let negative: Vec<f64> = drawdowns.iter().copied().filter(|d| *d < 0.0).collect();

    DrawdownRisk {
        current_drawdown: drawdowns.last().copied().unwrap_or(0.0),
        max_drawdown: drawdowns.iter().copied().fold(0.0, f64::min),
        avg_drawdown: stats::mean(&negative),
    }
}

pub fn liquidity_risk(bars: &[PriceBar]) -> LiquidityRisk {
    let recent = &bars[bars.len().saturating_sub(LIQUIDITY_WINDOW)..];
    let volumes: Vec<f64> = recent.iter().map(|b| b.volume as f64).collect();
    let avg_daily_volume = stats::mean(&volumes);
    let last_close = bars.last().map(|b| b.close).unwrap_or(0.0);

    LiquidityRisk {
        avg_daily_volume,
        dollar_volume: avg_daily_volume * last_close,
    }
}

/// Correlate the subject's daily returns with the average daily return of
/// the peers that traded on the same date.
pub fn peer_correlation(
    bars: &[PriceBar],
    peer_bars: &HashMap<String, Vec<PriceBar>>,
    peer_symbols: &[String],
) -> Option<f64> {
    let peer_returns: Vec<BTreeMap<NaiveDate, f64>> = peer_symbols
        .iter()
        .filter_map(|s| peer_bars.get(s))
        .map(|b| dated_returns(b))
        .collect();
    if peer_returns.is_empty() {
        return None;
    }

    let mut subject = Vec::new();
    let mut basket = Vec::new();
    for (date, ret) in dated_returns(bars) {
        let same_day: Vec<f64> = peer_returns.iter().filter_map(|p| p.get(&date).copied()).collect();
        if same_day.is_empty() {
            continue;
        }
        subject.push(ret);
        basket.push(stats::mean(&same_day));
    }

    if subject.len() < MIN_CORRELATION_OBSERVATIONS {
        tracing::debug!(observations = subject.len(), "Too few aligned peer returns for correlation");
        return None;
    }
    stats::correlation(&subject, &basket)
}

#[derive(Debug, Default)]
pub struct RiskAnalyzer;

impl RiskAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        bars: &[PriceBar],
        fundamentals: &FundamentalsRecord,
        peer_bars: &HashMap<String, Vec<PriceBar>>,
        peer_symbols: &[String],
    ) -> Result<RiskProfile, AnalysisError> {
        if bars.len() < 2 {
            return Err(AnalysisError::InsufficientData(
                "Need at least 2 bars for risk analysis".to_string(),
            ));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let returns = daily_returns(bars);

        Ok(RiskProfile {
            volatility: volatility_risk(&returns),
            drawdowns: drawdown_risk(&closes),
            market_risk: MarketRisk {
                beta: fundamentals.beta,
                correlation_vs_peers: peer_correlation(bars, peer_bars, peer_symbols),
            },
            liquidity: liquidity_risk(bars),
        })
    }
}
