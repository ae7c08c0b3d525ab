pub mod dcf;

use std::collections::HashSet;

use analysis_core::{stats, AnalysisError, FundamentalsRecord, PeerSet, PriceBar, ValuationError};
use serde::{Deserialize, Serialize};

pub use dcf::{discounted_cash_flow, DcfAssumptions, DcfInputs, DcfValuation};

/// Bars used for the 52-week high/low
const YEAR_BARS: usize = 252;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub price: f64,
    pub market_cap: f64,
    pub pe_ratio: f64,
    pub pb_ratio: f64,
    pub ps_ratio: f64,
    pub ev_revenue: f64,
    pub ev_ebitda: f64,
}

impl CurrentMetrics {
    pub fn from_fundamentals(price: f64, f: &FundamentalsRecord) -> Self {
        Self {
            price,
            market_cap: f.market_cap,
            pe_ratio: f.effective_pe(),
            pb_ratio: f.price_to_book,
            ps_ratio: f.price_to_sales,
            ev_revenue: f.enterprise_to_revenue,
            ev_ebitda: f.enterprise_to_ebitda,
        }
    }
}

/// Peer valuation statistics. Non-positive multiples are "not reported" and
/// excluded; an empty sample yields 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerMultiples {
    pub pe_median: f64,
    pub pe_mean: f64,
    pub pb_median: f64,
    pub pb_mean: f64,
    pub market_cap_median: f64,
    /// Symbols the caller asked for
    pub requested_peers: usize,
    /// Symbols that were present in the peer set
    pub matched_peers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub pe_multiple_target: f64,
    pub pb_multiple_target: f64,
    pub dcf_target: f64,
    pub average_target: f64,
    pub current_price: f64,
    pub year_high: f64,
    pub year_low: f64,
    pub upside_to_avg_target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub current_metrics: CurrentMetrics,
    pub peer_comparison: PeerMultiples,
    pub dcf_valuation: DcfValuation,
    pub price_targets: PriceTargets,
}

/// Collect peer multiple statistics over `peer_symbols`.
/// Symbols missing from the set are skipped; duplicates count once.
pub fn peer_multiples(peers: &PeerSet, peer_symbols: &[String]) -> PeerMultiples {
    let mut seen = HashSet::new();
    let mut pe_ratios = Vec::new();
    let mut pb_ratios = Vec::new();
    let mut market_caps = Vec::new();
    let mut requested = 0;
    let mut matched = 0;

    for symbol in peer_symbols {
        if !seen.insert(symbol.as_str()) {
            continue;
        }
        requested += 1;
        let Some(peer) = peers.get(symbol) else {
            tracing::debug!(symbol = %symbol, "Peer not in peer set, skipping");
            continue;
        };
        matched += 1;

        let f = &peer.fundamentals;
        let pe = f.effective_pe();
        if pe > 0.0 {
            pe_ratios.push(pe);
        }
        if f.price_to_book > 0.0 {
            pb_ratios.push(f.price_to_book);
        }
        if f.market_cap > 0.0 {
            market_caps.push(f.market_cap);
        }
    }

    PeerMultiples {
        pe_median: stats::median(&pe_ratios),
        pe_mean: stats::mean(&pe_ratios),
        pb_median: stats::median(&pb_ratios),
        pb_mean: stats::mean(&pb_ratios),
        market_cap_median: stats::median(&market_caps),
        requested_peers: requested,
        matched_peers: matched,
    }
}

/// Price implied by re-rating the company's own multiple to the peer median.
/// The per-share fundamental (EPS, book value) is backed out as price / own multiple.
pub fn implied_target(current_price: f64, own_multiple: f64, peer_median: f64) -> f64 {
    if own_multiple > 0.0 && peer_median > 0.0 {
        current_price / own_multiple * peer_median
    } else {
        0.0
    }
}

/// Average of the strictly positive targets, or the current price when none is.
pub fn average_target(targets: &[f64], current_price: f64) -> f64 {
    let positive: Vec<f64> = targets.iter().copied().filter(|t| *t > 0.0).collect();
    if positive.is_empty() {
        current_price
    } else {
        stats::mean(&positive)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValuationAnalyzer {
    assumptions: DcfAssumptions,
}

impl ValuationAnalyzer {
    pub fn new(assumptions: DcfAssumptions) -> Self {
        Self { assumptions }
    }

    pub fn assumptions(&self) -> &DcfAssumptions {
        &self.assumptions
    }

    /// Value the company at its latest close against the given peer subset.
    pub fn analyze(
        &self,
        bars: &[PriceBar],
        fundamentals: &FundamentalsRecord,
        peers: &PeerSet,
        peer_symbols: &[String],
    ) -> Result<ValuationResult, AnalysisError> {
        let last = bars.last().ok_or_else(|| {
            AnalysisError::InsufficientData("Need at least one bar for valuation".to_string())
        })?;
        let price = last.close;
        if price <= 0.0 {
            return Err(ValuationError::NonPositivePrice(price).into());
        }

        let current_metrics = CurrentMetrics::from_fundamentals(price, fundamentals);
        let peer_comparison = peer_multiples(peers, peer_symbols);
        let dcf_valuation = discounted_cash_flow(price, fundamentals, &self.assumptions)?;

        let pe_multiple_target = implied_target(price, current_metrics.pe_ratio, peer_comparison.pe_median);
        let pb_multiple_target = implied_target(price, current_metrics.pb_ratio, peer_comparison.pb_median);
        let dcf_target = dcf_valuation.value_per_share;
        let average = average_target(&[pe_multiple_target, pb_multiple_target, dcf_target], price);

        let recent = &bars[bars.len().saturating_sub(YEAR_BARS)..];
        let year_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let year_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let price_targets = PriceTargets {
            pe_multiple_target,
            pb_multiple_target,
            dcf_target,
            average_target: average,
            current_price: price,
            year_high,
            year_low,
            upside_to_avg_target: (average - price) / price * 100.0,
        };

        tracing::debug!(
            price,
            pe_target = pe_multiple_target,
            pb_target = pb_multiple_target,
            dcf_target,
            average_target = average,
            "Computed price targets"
        );

        Ok(ValuationResult {
            current_metrics,
            peer_comparison,
            dcf_valuation,
            price_targets,
        })
    }
}
