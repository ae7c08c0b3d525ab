use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Snapshot of a company's reported and derived metrics.
///
/// Every numeric field defaults to `0.0` when the key is missing, `null`, or
/// not a finite number; `0.0` means "not reported" and is excluded from peer
/// statistics. Keys are accepted both in the vendor's camelCase form
/// (`marketCap`, `forwardPE`) and in the snake_case form written by the peer
/// collector (`market_cap`, `pe_ratio`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    #[serde(rename = "marketCap", alias = "market_cap", default, deserialize_with = "lenient_f64")]
    pub market_cap: f64,
    #[serde(rename = "enterpriseValue", alias = "enterprise_value", default, deserialize_with = "lenient_f64")]
    pub enterprise_value: f64,
    #[serde(rename = "trailingPE", alias = "trailing_pe", default, deserialize_with = "lenient_f64")]
    pub trailing_pe: f64,
    /// The peer collector stores forward-else-trailing P/E under `pe_ratio`
    #[serde(rename = "forwardPE", alias = "forward_pe", alias = "pe_ratio", default, deserialize_with = "lenient_f64")]
    pub forward_pe: f64,
    #[serde(rename = "priceToBook", alias = "price_to_book", alias = "pb_ratio", default, deserialize_with = "lenient_f64")]
    pub price_to_book: f64,
    #[serde(
        rename = "priceToSalesTrailing12Months",
        alias = "price_to_sales",
        alias = "ps_ratio",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub price_to_sales: f64,
    #[serde(rename = "enterpriseToRevenue", alias = "ev_revenue", default, deserialize_with = "lenient_f64")]
    pub enterprise_to_revenue: f64,
    #[serde(rename = "enterpriseToEbitda", alias = "ev_ebitda", default, deserialize_with = "lenient_f64")]
    pub enterprise_to_ebitda: f64,
    #[serde(rename = "debtToEquity", alias = "debt_to_equity", default, deserialize_with = "lenient_f64")]
    pub debt_to_equity: f64,
    #[serde(rename = "returnOnEquity", alias = "return_on_equity", alias = "roe", default, deserialize_with = "lenient_f64")]
    pub return_on_equity: f64,
    #[serde(rename = "operatingMargins", alias = "operating_margin", default, deserialize_with = "lenient_f64")]
    pub operating_margin: f64,
    #[serde(rename = "profitMargins", alias = "profit_margin", default, deserialize_with = "lenient_f64")]
    pub profit_margin: f64,
    #[serde(rename = "revenueGrowth", alias = "revenue_growth", default, deserialize_with = "lenient_f64")]
    pub revenue_growth: f64,
    #[serde(rename = "earningsGrowth", alias = "earnings_growth", default, deserialize_with = "lenient_f64")]
    pub earnings_growth: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub beta: f64,
    #[serde(rename = "dividendYield", alias = "dividend_yield", default, deserialize_with = "lenient_f64")]
    pub dividend_yield: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub industry: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(rename = "longName", alias = "long_name", default, deserialize_with = "null_as_default")]
    pub long_name: String,
}

impl FundamentalsRecord {
    /// Forward P/E when reported, otherwise trailing P/E (possibly `0.0`)
    pub fn effective_pe(&self) -> f64 {
        if self.forward_pe > 0.0 {
            self.forward_pe
        } else {
            self.trailing_pe
        }
    }
}

/// Peer company fundamentals plus precomputed performance figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerFundamentals {
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub returns_1m: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub returns_3m: f64,
    /// Trailing one-year return, percent
    #[serde(rename = "returns_1y", default, deserialize_with = "lenient_f64")]
    pub trailing_return: f64,
    /// Annualized volatility of daily returns, percent
    #[serde(rename = "volatility_annualized", default, deserialize_with = "lenient_f64")]
    pub annualized_volatility: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub year_high: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub year_low: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_volume: f64,
    #[serde(flatten)]
    pub fundamentals: FundamentalsRecord,
}

/// Peer fundamentals keyed by ticker symbol
pub type PeerSet = HashMap<String, PeerFundamentals>;

/// Everything the engine needs to analyze one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// Ascending by date, unique dates
    pub bars: Vec<PriceBar>,
    pub fundamentals: FundamentalsRecord,
    pub peers: PeerSet,
    /// Daily histories for peers, when the collector stored them
    #[serde(default)]
    pub peer_bars: HashMap<String, Vec<PriceBar>>,
}

impl MarketSnapshot {
    pub fn current_price(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<NumberOrText>::deserialize(deserializer)? {
        None => return Ok(0.0),
        Some(NumberOrText::Number(n)) => n,
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => return Ok(0.0),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}")))?,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_keys_with_nulls_default_to_zero() {
        let json = r#"{
            "marketCap": 42000000000,
            "forwardPE": 14.5,
            "trailingPE": 18.2,
            "priceToBook": null,
            "operatingMargins": 0.31,
            "beta": "0.45",
            "sector": "Basic Materials",
            "industry": null,
            "unrelatedKey": [1, 2, 3]
        }"#;
        let record: FundamentalsRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.market_cap, 42_000_000_000.0);
        assert_eq!(record.forward_pe, 14.5);
        assert_eq!(record.price_to_book, 0.0);
        assert_eq!(record.revenue_growth, 0.0);
        assert!((record.beta - 0.45).abs() < 1e-12);
        assert_eq!(record.sector, "Basic Materials");
        assert_eq!(record.industry, "");
        assert_eq!(record.effective_pe(), 14.5);
    }

    #[test]
    fn test_effective_pe_falls_back_to_trailing() {
        let record = FundamentalsRecord {
            trailing_pe: 21.0,
            ..Default::default()
        };
        assert_eq!(record.effective_pe(), 21.0);
    }

    #[test]
    fn test_non_numeric_text_is_rejected() {
        let result: Result<FundamentalsRecord, _> = serde_json::from_str(r#"{"marketCap": "large"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_peer_record_snake_case_keys() {
        let json = r#"{
            "company_name": "Newmont Corporation",
            "current_price": 52.1,
            "market_cap": 60000000000,
            "pe_ratio": 13.2,
            "pb_ratio": 1.6,
            "returns_1y": 24.5,
            "volatility_annualized": 31.0,
            "full_time_employees": 31000
        }"#;
        let peer: PeerFundamentals = serde_json::from_str(json).unwrap();

        assert_eq!(peer.company_name, "Newmont Corporation");
        assert_eq!(peer.trailing_return, 24.5);
        assert_eq!(peer.annualized_volatility, 31.0);
        assert_eq!(peer.fundamentals.market_cap, 60_000_000_000.0);
        assert_eq!(peer.fundamentals.effective_pe(), 13.2);
        assert_eq!(peer.fundamentals.price_to_book, 1.6);
    }
}
