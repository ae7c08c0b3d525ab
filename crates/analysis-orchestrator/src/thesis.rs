use analysis_core::{stats, PeerSet};
use chrono::NaiveDate;
use risk_analysis::RiskProfile;
use serde::{Deserialize, Serialize};
use technical_analysis::TechnicalSnapshot;
use valuation_analysis::ValuationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Buy,
    Overweight,
    Hold,
    Underweight,
}

impl Recommendation {
    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Overweight => "OVERWEIGHT",
            Recommendation::Hold => "HOLD",
            Recommendation::Underweight => "UNDERWEIGHT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    /// Bullish when price > SMA50 > SMA200, bearish when price < SMA50 < SMA200.
    /// Anything else, including undefined averages, is neutral.
    pub fn classify(price: f64, sma_50: Option<f64>, sma_200: Option<f64>) -> Self {
        match (sma_50, sma_200) {
            (Some(mid), Some(long)) if price > mid && mid > long => Trend::Bullish,
            (Some(mid), Some(long)) if price < mid && mid < long => Trend::Bearish,
            _ => Trend::Neutral,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Trend::Bullish => "Bullish",
            Trend::Bearish => "Bearish",
            Trend::Neutral => "Neutral",
        }
    }
}

/// Upside-to-target cut-offs, in percent. A policy choice, not a law of finance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// Upside above this is BUY
    pub buy: f64,
    /// Upside above this (and not BUY) is OVERWEIGHT
    pub overweight: f64,
    /// Upside above this (and not OVERWEIGHT) is HOLD; the rest is UNDERWEIGHT
    pub hold: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            buy: 20.0,
            overweight: 10.0,
            hold: -10.0,
        }
    }
}

impl RecommendationThresholds {
    pub fn classify(&self, upside_pct: f64) -> Recommendation {
        if upside_pct > self.buy {
            Recommendation::Buy
        } else if upside_pct > self.overweight {
            Recommendation::Overweight
        } else if upside_pct > self.hold {
            Recommendation::Hold
        } else {
            Recommendation::Underweight
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub pe_ratio: f64,
    pub pb_ratio: f64,
    pub market_cap_bn: f64,
    pub beta: f64,
    pub annual_volatility: f64,
    pub rsi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerComparison {
    /// Own P/E against the peer median
    pub relative_valuation: String,
    pub peer_median_pe: f64,
    pub peer_median_pb: f64,
    /// Mean trailing one-year return of the peers reporting one, percent
    pub peer_avg_return: Option<f64>,
    /// Mean annualized volatility of the peers reporting one, percent
    pub peer_avg_volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentThesis {
    pub symbol: String,
    pub company: String,
    pub analysis_date: NaiveDate,
    pub current_price: f64,
    pub recommendation: Recommendation,
    pub price_target: f64,
    pub upside_potential: f64,
    pub trend: Trend,
    pub technical_signals: Vec<String>,
    pub risk_factors: Vec<String>,
    pub key_metrics: KeyMetrics,
    pub peer_comparison: PeerComparison,
}

/// Turns indicator, valuation and risk outputs into a thesis
#[derive(Debug, Clone, Default)]
pub struct ThesisSynthesizer {
    pub recommendation: RecommendationThresholds,
    pub signals: SignalThresholds,
    pub sector_risk_factors: Vec<String>,
}

impl ThesisSynthesizer {
    pub fn technical_signals(&self, latest: &TechnicalSnapshot) -> Vec<String> {
        let mut signals = Vec::new();
        let price = latest.close;

        if let Some(rsi) = latest.rsi_14 {
            if rsi > self.signals.rsi_overbought {
                signals.push(format!("Overbought (RSI > {})", self.signals.rsi_overbought));
            } else if rsi < self.signals.rsi_oversold {
                signals.push(format!("Oversold (RSI < {})", self.signals.rsi_oversold));
            }
        }

        match (latest.bb_upper, latest.bb_lower) {
            (Some(upper), _) if price > upper => signals.push("Above Bollinger Upper Band".to_string()),
            (_, Some(lower)) if price < lower => signals.push("Below Bollinger Lower Band".to_string()),
            _ => {}
        }

        signals
    }

    pub fn risk_factors(&self, risk: &RiskProfile) -> Vec<String> {
        let mut factors = vec![
            format!("High volatility: {:.1}% annual", risk.volatility.annual_volatility),
            format!("Maximum drawdown: {:.1}%", risk.drawdowns.max_drawdown),
        ];
        factors.extend(self.sector_risk_factors.iter().cloned());
        factors
    }

    pub fn peer_comparison(&self, valuation: &ValuationResult, peers: &PeerSet, peer_symbols: &[String]) -> PeerComparison {
        let own_pe = valuation.current_metrics.pe_ratio;
        let peer_pe = valuation.peer_comparison.pe_median;
        let relative_valuation = if own_pe <= 0.0 || peer_pe <= 0.0 {
            "Not comparable"
        } else if own_pe < peer_pe {
            "Discount to peers"
        } else if own_pe > peer_pe {
            "Premium to peers"
        } else {
            "In line with peers"
        };

        let matched: Vec<_> = peer_symbols.iter().filter_map(|s| peers.get(s)).collect();
        // the collector writes 0 for figures it could not compute
        let returns: Vec<f64> = matched
            .iter()
            .map(|p| p.trailing_return)
            .filter(|r| *r != 0.0)
            .collect();
        let volatilities: Vec<f64> = matched
            .iter()
            .map(|p| p.annualized_volatility)
            .filter(|v| *v > 0.0)
            .collect();

        PeerComparison {
            relative_valuation: relative_valuation.to_string(),
            peer_median_pe: peer_pe,
            peer_median_pb: valuation.peer_comparison.pb_median,
            peer_avg_return: (!returns.is_empty()).then(|| stats::mean(&returns)),
            peer_avg_volatility: (!volatilities.is_empty()).then(|| stats::mean(&volatilities)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn synthesize(
        &self,
        symbol: &str,
        company: &str,
        latest: &TechnicalSnapshot,
        valuation: &ValuationResult,
        risk: &RiskProfile,
        peers: &PeerSet,
        peer_symbols: &[String],
    ) -> InvestmentThesis {
        let upside = valuation.price_targets.upside_to_avg_target;
        let metrics = &valuation.current_metrics;

        InvestmentThesis {
            symbol: symbol.to_string(),
            company: company.to_string(),
            analysis_date: latest.date,
            current_price: latest.close,
            recommendation: self.recommendation.classify(upside),
            price_target: valuation.price_targets.average_target,
            upside_potential: upside,
            trend: Trend::classify(latest.close, latest.sma_50, latest.sma_200),
            technical_signals: self.technical_signals(latest),
            risk_factors: self.risk_factors(risk),
            key_metrics: KeyMetrics {
                pe_ratio: metrics.pe_ratio,
                pb_ratio: metrics.pb_ratio,
                market_cap_bn: metrics.market_cap / 1e9,
                beta: risk.market_risk.beta,
                annual_volatility: risk.volatility.annual_volatility,
                rsi: latest.rsi_14,
            },
            peer_comparison: self.peer_comparison(valuation, peers, peer_symbols),
        }
    }
}
