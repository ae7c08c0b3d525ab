use analysis_core::{AnalysisError, PriceBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::*;

pub const SMA_SHORT: usize = 20;
pub const SMA_MEDIUM: usize = 50;
pub const SMA_LONG: usize = 200;
pub const EMA_FAST: usize = 12;
pub const EMA_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD: f64 = 2.0;
pub const VOLUME_SMA_PERIOD: usize = 20;
pub const VOLATILITY_WINDOW: usize = 30;

/// Indicator columns aligned 1:1 with the input bars, for charting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalSeries {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    pub sma_200: Vec<Option<f64>>,
    pub ema_12: Vec<Option<f64>>,
    pub ema_26: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_histogram: Vec<Option<f64>>,
    pub rsi_14: Vec<Option<f64>>,
    pub bb_middle: Vec<Option<f64>>,
    pub bb_upper: Vec<Option<f64>>,
    pub bb_lower: Vec<Option<f64>>,
    pub volume_sma_20: Vec<Option<f64>>,
    /// Volume relative to its 20-day average
    pub volume_ratio: Vec<Option<f64>>,
    pub return_1d: Vec<Option<f64>>,
    pub return_5d: Vec<Option<f64>>,
    pub return_22d: Vec<Option<f64>>,
    /// Annualized 30-day volatility, percent
    pub volatility_30d: Vec<Option<f64>>,
}

/// One row of a `TechnicalSeries`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi_14: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volume_sma_20: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub return_1d: Option<f64>,
    pub return_5d: Option<f64>,
    pub return_22d: Option<f64>,
    pub volatility_30d: Option<f64>,
}

fn column(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

impl TechnicalSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn at(&self, i: usize) -> Option<TechnicalSnapshot> {
        Some(TechnicalSnapshot {
            date: *self.dates.get(i)?,
            close: *self.close.get(i)?,
            sma_20: column(&self.sma_20, i),
            sma_50: column(&self.sma_50, i),
            sma_200: column(&self.sma_200, i),
            ema_12: column(&self.ema_12, i),
            ema_26: column(&self.ema_26, i),
            macd: column(&self.macd, i),
            macd_signal: column(&self.macd_signal, i),
            macd_histogram: column(&self.macd_histogram, i),
            rsi_14: column(&self.rsi_14, i),
            bb_middle: column(&self.bb_middle, i),
            bb_upper: column(&self.bb_upper, i),
            bb_lower: column(&self.bb_lower, i),
            volume_sma_20: column(&self.volume_sma_20, i),
            volume_ratio: column(&self.volume_ratio, i),
            return_1d: column(&self.return_1d, i),
            return_5d: column(&self.return_5d, i),
            return_22d: column(&self.return_22d, i),
            volatility_30d: column(&self.volatility_30d, i),
        })
    }

    pub fn latest(&self) -> Option<TechnicalSnapshot> {
        self.len().checked_sub(1).and_then(|i| self.at(i))
    }
}

#[derive(Debug, Default)]
pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute every indicator column for the given bars
    pub fn calculate(&self, bars: &[PriceBar]) -> Result<TechnicalSeries, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "Need at least one bar for technical indicators".to_string(),
            ));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let defined_closes: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
        let ema_12 = ema(&defined_closes, EMA_FAST);
        let ema_26 = ema(&defined_closes, EMA_SLOW);
        let macd_result = macd(&closes, EMA_FAST, EMA_SLOW, MACD_SIGNAL);
        let bb = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD);
        let volume_sma_20 = sma(&volumes, VOLUME_SMA_PERIOD);
        let volume_ratio = ratio(&volumes, &volume_sma_20);
        let return_1d = pct_change(&closes, 1);
        let volatility_30d = rolling_volatility(&return_1d, VOLATILITY_WINDOW);

        let series = TechnicalSeries {
            dates: bars.iter().map(|b| b.date).collect(),
            sma_20: sma(&closes, SMA_SHORT),
            sma_50: sma(&closes, SMA_MEDIUM),
            sma_200: sma(&closes, SMA_LONG),
            ema_12,
            ema_26,
            macd: macd_result.macd_line,
            macd_signal: macd_result.signal_line,
            macd_histogram: macd_result.histogram,
            rsi_14: rsi(&closes, RSI_PERIOD),
            bb_middle: bb.middle,
            bb_upper: bb.upper,
            bb_lower: bb.lower,
            volume_sma_20,
            volume_ratio,
            return_5d: pct_change(&closes, 5),
            return_22d: pct_change(&closes, 22),
            return_1d,
            volatility_30d,
            close: closes,
        };

        tracing::debug!(bars = series.len(), "Computed technical series");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        let engine = TechnicalAnalysisEngine::new();
        assert!(matches!(engine.calculate(&[]), Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_series_aligned_with_bars() {
        let closes: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let series = TechnicalAnalysisEngine::new().calculate(&bars_from_closes(&closes)).unwrap();

        assert_eq!(series.len(), 60);
        for column in [&series.sma_20, &series.sma_200, &series.rsi_14, &series.volatility_30d, &series.macd] {
            assert_eq!(column.len(), 60);
        }
        assert!(series.sma_200.iter().all(|v| v.is_none()));
        assert!(series.sma_50[48].is_none());
        assert!(series.sma_50[49].is_some());
    }

    #[test]
    fn test_single_bar() {
        let series = TechnicalAnalysisEngine::new().calculate(&bars_from_closes(&[10.0])).unwrap();
        let latest = series.latest().unwrap();

        assert_eq!(latest.close, 10.0);
        assert_eq!(latest.ema_12, Some(10.0));
        assert_eq!(latest.macd, Some(0.0));
        assert!(latest.sma_20.is_none());
        assert!(latest.rsi_14.is_none());
        assert!(latest.return_1d.is_none());
    }

    #[test]
    fn test_constant_price_scenario() {
        let series = TechnicalAnalysisEngine::new().calculate(&bars_from_closes(&[10.0; 252])).unwrap();
        let latest = series.latest().unwrap();

        assert_eq!(latest.return_1d, Some(0.0));
        assert_eq!(latest.return_22d, Some(0.0));
        assert!(latest.volatility_30d.unwrap().abs() < 1e-12);
        assert_eq!(latest.rsi_14, Some(50.0));
        assert_eq!(latest.volume_ratio, Some(1.0));
        assert!((latest.bb_upper.unwrap() - 10.0).abs() < 1e-9);
        assert!((latest.bb_lower.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_column_reads_as_undefined() {
        let mut series = TechnicalAnalysisEngine::new().calculate(&bars_from_closes(&[10.0; 30])).unwrap();
        series.sma_20.truncate(5);
        series.rsi_14.clear();

        let latest = series.latest().unwrap();
        assert_eq!(latest.close, 10.0);
        assert!(latest.sma_20.is_none());
        assert!(latest.rsi_14.is_none());
        assert_eq!(latest.return_1d, Some(0.0));
        assert!(series.at(30).is_none());
    }
}
