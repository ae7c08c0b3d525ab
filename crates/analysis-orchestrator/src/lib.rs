pub mod config;
pub mod thesis;

use std::collections::HashSet;

use analysis_core::{AnalysisError, MarketSnapshot, SnapshotSource};
use risk_analysis::{RiskAnalyzer, RiskProfile};
use serde::{Deserialize, Serialize};
use technical_analysis::{TechnicalAnalysisEngine, TechnicalSeries};
use valuation_analysis::{ValuationAnalyzer, ValuationResult};

pub use config::EngineConfig;
pub use thesis::{
    InvestmentThesis, KeyMetrics, PeerComparison, Recommendation, RecommendationThresholds, SignalThresholds,
    ThesisSynthesizer, Trend,
};

/// Everything produced for one symbol, ready for charting and reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub technical: TechnicalSeries,
    pub valuation: ValuationResult,
    pub risk: RiskProfile,
    pub thesis: InvestmentThesis,
}

/// Runs technical, valuation and risk analysis over a snapshot and
/// synthesizes the thesis. Holds configuration only; every call is
/// independent.
pub struct AnalysisEngine {
    config: EngineConfig,
    technical_analyzer: TechnicalAnalysisEngine,
    valuation_analyzer: ValuationAnalyzer,
    risk_analyzer: RiskAnalyzer,
    synthesizer: ThesisSynthesizer,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            technical_analyzer: TechnicalAnalysisEngine::new(),
            valuation_analyzer: ValuationAnalyzer::new(config.dcf),
            risk_analyzer: RiskAnalyzer::new(),
            synthesizer: ThesisSynthesizer {
                recommendation: config.recommendation,
                signals: config.signals,
                sector_risk_factors: config.sector_risk_factors.clone(),
            },
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Peers the analysis compares against: the configured list (first
    /// occurrence of each symbol), or every peer other than the subject when
    /// none is configured.
    pub fn peer_subset(&self, snapshot: &MarketSnapshot) -> Vec<String> {
        if !self.config.peer_symbols.is_empty() {
            let mut seen = HashSet::new();
            return self
                .config
                .peer_symbols
                .iter()
                .filter(|s| seen.insert(s.as_str()))
                .cloned()
                .collect();
        }
        let mut symbols: Vec<String> = snapshot
            .peers
            .keys()
            .filter(|s| !s.eq_ignore_ascii_case(&snapshot.symbol))
            .cloned()
            .collect();
        symbols.sort();
        symbols
    }

    /// Load a snapshot from `source` and analyze it.
    /// A load failure means the analysis is unavailable; nothing partial is produced.
    pub fn run<S: SnapshotSource>(&self, source: &S) -> Result<AnalysisReport, AnalysisError> {
        let snapshot = source.load().map_err(|e| {
            tracing::error!(symbol = %source.symbol(), error = %e, "Analysis unavailable");
            e
        })?;
        self.analyze(&snapshot)
    }

    pub fn analyze(&self, snapshot: &MarketSnapshot) -> Result<AnalysisReport, AnalysisError> {
        let peer_symbols = self.peer_subset(snapshot);

        let technical = self.technical_analyzer.calculate(&snapshot.bars)?;
        let latest = technical.latest().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("No price bars for {}", snapshot.symbol))
        })?;

        let valuation =
            self.valuation_analyzer
                .analyze(&snapshot.bars, &snapshot.fundamentals, &snapshot.peers, &peer_symbols)?;
        let risk = self.risk_analyzer.analyze(
            &snapshot.bars,
            &snapshot.fundamentals,
            &snapshot.peer_bars,
            &peer_symbols,
        )?;

        let company = self
            .config
            .company_name
            .clone()
            .filter(|_| self.config.symbol.eq_ignore_ascii_case(&snapshot.symbol))
            .or_else(|| Some(snapshot.fundamentals.long_name.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| snapshot.symbol.clone());

        let thesis = self.synthesizer.synthesize(
            &snapshot.symbol,
            &company,
            &latest,
            &valuation,
            &risk,
            &snapshot.peers,
            &peer_symbols,
        );

        tracing::info!(
            symbol = %snapshot.symbol,
            recommendation = thesis.recommendation.to_label(),
            trend = thesis.trend.to_label(),
            price_target = thesis.price_target,
            upside = thesis.upside_potential,
            "Investment thesis ready"
        );

        Ok(AnalysisReport {
            symbol: snapshot.symbol.clone(),
            technical,
            valuation,
            risk,
            thesis,
        })
    }
}
