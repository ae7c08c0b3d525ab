use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use valuation_analysis::DcfAssumptions;

use crate::thesis::{RecommendationThresholds, SignalThresholds};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // Subject
    pub symbol: String,
    pub company_name: Option<String>,

    // Data store
    pub data_dir: PathBuf,
    pub peer_prices_dir: Option<PathBuf>,

    /// Peers used for multiples, correlation and peer summary.
    /// Empty = every peer in the peer set except the subject itself.
    pub peer_symbols: Vec<String>,

    // Policy
    pub dcf: DcfAssumptions,
    pub recommendation: RecommendationThresholds,
    pub signals: SignalThresholds,

    /// Appended to the data-driven risk factors in every thesis
    pub sector_risk_factors: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "ABX.TO".to_string(),
            company_name: None,
            data_dir: PathBuf::from("data/raw"),
            peer_prices_dir: None,
            peer_symbols: Vec::new(),
            dcf: DcfAssumptions::default(),
            recommendation: RecommendationThresholds::default(),
            signals: SignalThresholds::default(),
            sector_risk_factors: Vec::new(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn list_var(name: &str, separator: char) -> Vec<String> {
    env::var(name)
        .map(|raw| {
            raw.split(separator)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl EngineConfig {
    /// Build from `THESIS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let dcf = DcfAssumptions {
            wacc: parse_var("THESIS_WACC", defaults.dcf.wacc)?,
            terminal_growth: parse_var("THESIS_TERMINAL_GROWTH", defaults.dcf.terminal_growth)?,
            projection_years: parse_var("THESIS_PROJECTION_YEARS", defaults.dcf.projection_years)?,
            fcf_conversion: parse_var("THESIS_FCF_CONVERSION", defaults.dcf.fcf_conversion)?,
            revenue_to_market_cap: parse_var("THESIS_REVENUE_TO_MARKET_CAP", defaults.dcf.revenue_to_market_cap)?,
        };

        let recommendation = RecommendationThresholds {
            buy: parse_var("THESIS_BUY_ABOVE", defaults.recommendation.buy)?,
            overweight: parse_var("THESIS_OVERWEIGHT_ABOVE", defaults.recommendation.overweight)?,
            hold: parse_var("THESIS_HOLD_ABOVE", defaults.recommendation.hold)?,
        };
        let signals = SignalThresholds {
            rsi_overbought: parse_var("THESIS_RSI_OVERBOUGHT", defaults.signals.rsi_overbought)?,
            rsi_oversold: parse_var("THESIS_RSI_OVERSOLD", defaults.signals.rsi_oversold)?,
        };

        let config = Self {
            symbol: env::var("THESIS_SYMBOL").unwrap_or(defaults.symbol),
            company_name: env::var("THESIS_COMPANY_NAME").ok().filter(|s| !s.trim().is_empty()),
            data_dir: env::var("THESIS_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            peer_prices_dir: env::var("THESIS_PEER_PRICES_DIR").ok().map(PathBuf::from),
            peer_symbols: list_var("THESIS_PEERS", ','),
            dcf,
            recommendation,
            signals,
            sector_risk_factors: list_var("THESIS_RISK_FACTORS", ';'),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("symbol must not be empty");
        }
        let r = &self.recommendation;
        if !(r.buy >= r.overweight && r.overweight >= r.hold) {
            anyhow::bail!(
                "recommendation thresholds must be ordered buy >= overweight >= hold, got {} / {} / {}",
                r.buy,
                r.overweight,
                r.hold
            );
        }
        if self.signals.rsi_oversold >= self.signals.rsi_overbought {
            anyhow::bail!(
                "RSI oversold threshold {} must be below overbought threshold {}",
                self.signals.rsi_oversold,
                self.signals.rsi_overbought
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dcf.wacc, 0.08);
        assert_eq!(config.recommendation.buy, 20.0);
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.recommendation.hold = 15.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.signals.rsi_oversold = 80.0;
        assert!(config.validate().is_err());
    }

    // Single test touching the process environment to avoid races between tests
    #[test]
    fn test_from_env() {
        env::set_var("THESIS_SYMBOL", "NEM");
        env::set_var("THESIS_PEERS", "AEM, KGC,,EGO");
        env::set_var("THESIS_WACC", "0.09");
        env::set_var("THESIS_RISK_FACTORS", "Commodity price exposure; Mining operational risks");
        let config = EngineConfig::from_env().unwrap();

        assert_eq!(config.symbol, "NEM");
        assert_eq!(config.peer_symbols, vec!["AEM", "KGC", "EGO"]);
        assert_eq!(config.dcf.wacc, 0.09);
        assert_eq!(config.dcf.terminal_growth, 0.03);
        assert_eq!(config.sector_risk_factors.len(), 2);

        env::set_var("THESIS_WACC", "eight percent");
        assert!(EngineConfig::from_env().is_err());

        for name in ["THESIS_SYMBOL", "THESIS_PEERS", "THESIS_WACC", "THESIS_RISK_FACTORS"] {
            env::remove_var(name);
        }
    }
}
