//! JSON snapshots written by the collector.
//!
//! The collector serializes missing floats as bare `NaN` / `Infinity` tokens,
//! which are not JSON. They are read as `null` (and so default to 0).

use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use analysis_core::{FundamentalsRecord, LoadError, PeerSet};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace non-finite number tokens outside string literals with `null`.
fn null_non_finite(raw: &str) -> Cow<'_, str> {
    if !NON_FINITE_TOKENS.iter().any(|t| raw.contains(t)) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut in_string = false;
    let mut escaped = false;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

fn json_error(path: &Path) -> impl Fn(serde_json::Error) -> LoadError + '_ {
    move |source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    serde_json::from_str(&null_non_finite(&raw)).map_err(json_error(path))
}

/// Load the subject company's fundamentals snapshot (a flat JSON object).
/// Anything other than an object is rejected, even where serde would accept
/// a positional array.
pub fn read_fundamentals(path: &Path) -> Result<FundamentalsRecord, LoadError> {
    let object: Map<String, Value> = read_json(path)?;
    serde_json::from_value(Value::Object(object)).map_err(json_error(path))
}

/// Load the peer mapping: `{ "SYMBOL": { ...peer record... }, ... }`.
pub fn read_peer_set(path: &Path) -> Result<PeerSet, LoadError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_fundamentals() {
        let file = write_temp(r#"{"marketCap": 1000000, "priceToBook": 1.4, "country": "Canada"}"#);
        let record = read_fundamentals(file.path()).unwrap();
        assert_eq!(record.market_cap, 1_000_000.0);
        assert_eq!(record.price_to_book, 1.4);
        assert_eq!(record.country, "Canada");
    }

    #[test]
    fn test_malformed_json_is_load_error() {
        let file = write_temp("{ not json");
        assert!(matches!(read_fundamentals(file.path()), Err(LoadError::Json { .. })));

        let file = write_temp("[1, 2, 3]");
        assert!(matches!(read_fundamentals(file.path()), Err(LoadError::Json { .. })));
    }

    #[test]
    fn test_read_peer_set() {
        let file = write_temp(
            r#"{
                "NEM": {"company_name": "Newmont", "pe_ratio": 12.0, "returns_1y": 10.0},
                "KGC": {"company_name": "Kinross", "pe_ratio": 0, "volatility_annualized": 40.0}
            }"#,
        );
        let peers = read_peer_set(file.path()).unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers["NEM"].fundamentals.forward_pe, 12.0);
        assert_eq!(peers["KGC"].annualized_volatility, 40.0);
    }

    #[test]
    fn test_non_object_fundamentals_rejected() {
        for contents in ["[35000000000, 0, 14.0]", "[]", "42", "\"ABX\"", "null"] {
            let file = write_temp(contents);
            assert!(
                matches!(read_fundamentals(file.path()), Err(LoadError::Json { .. })),
                "{contents} should not load"
            );
        }
    }

    #[test]
    fn test_non_finite_tokens_read_as_null() {
        let file = write_temp(
            r#"{
                "NEM": {"company_name": "NaN Mining", "returns_1y": NaN, "volatility_annualized": Infinity, "pe_ratio": 12.0},
                "KGC": {"company_name": "Kinross \"Infinity\"", "returns_1m": -Infinity, "pe_ratio": 9.5}
            }"#,
        );
        let peers = read_peer_set(file.path()).unwrap();

        assert_eq!(peers["NEM"].company_name, "NaN Mining");
        assert_eq!(peers["NEM"].trailing_return, 0.0);
        assert_eq!(peers["NEM"].annualized_volatility, 0.0);
        assert_eq!(peers["NEM"].fundamentals.forward_pe, 12.0);
        assert_eq!(peers["KGC"].company_name, "Kinross \"Infinity\"");
        assert_eq!(peers["KGC"].returns_1m, 0.0);

        assert_eq!(null_non_finite(r#"{"a": 1}"#), Cow::Borrowed(r#"{"a": 1}"#));
        assert_eq!(null_non_finite(r#"[NaN, "NaN", -Infinity]"#), r#"[null, "NaN", null]"#);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_peer_set(Path::new("/nonexistent/peers.json")),
            Err(LoadError::Missing { .. })
        ));
    }
}
