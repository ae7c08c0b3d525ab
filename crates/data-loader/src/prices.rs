use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use analysis_core::{LoadError, PriceBar};
use chrono::NaiveDate;
use csv::StringRecord;

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| LoadError::Malformed {
                    path: path.to_path_buf(),
                    line: 1,
                    reason: format!("missing column '{name}' (need {})", REQUIRED_COLUMNS.join(", ")),
                })
        };

        Ok(Self {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

/// Read a daily price table from disk.
pub fn read_price_file(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    parse_prices(file, path)
}

/// Parse a daily price table.
///
/// Expects a header row naming Date, Open, High, Low, Close and Volume in any
/// order and case; other columns are ignored. Rows come back sorted ascending
/// by date. A repeated date rejects the whole table.
pub fn parse_prices<R: Read>(reader: R, path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let columns = Columns::resolve(&headers, path)?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        bars.push(parse_row(&record, &columns, path, line)?);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    bars.sort_by_key(|b| b.date);
    if let Some(dup) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(LoadError::DuplicateDate {
            path: path.to_path_buf(),
            date: dup[0].date,
        });
    }

    Ok(bars)
}

fn parse_row(record: &StringRecord, columns: &Columns, path: &Path, line: u64) -> Result<PriceBar, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    };
    let cell = |idx: usize| record.get(idx).unwrap_or("");

    let price = |idx: usize, name: &str| -> Result<f64, LoadError> {
        let raw = cell(idx);
        let value: f64 = raw
            .parse()
            .map_err(|_| malformed(format!("{name} '{raw}' is not a number")))?;
        if !value.is_finite() || value < 0.0 {
            return Err(malformed(format!("{name} must be a finite non-negative number, got {raw}")));
        }
        Ok(value)
    };

    let raw_date = cell(columns.date);
    // Vendor exports append a time and UTC offset ("2024-03-01 00:00:00-05:00")
    let date = raw_date
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| malformed(format!("unparseable date '{raw_date}'")))?;

    Ok(PriceBar {
        date,
        open: price(columns.open, "open")?,
        high: price(columns.high, "high")?,
        low: price(columns.low, "low")?,
        close: price(columns.close, "close")?,
        volume: parse_volume(cell(columns.volume)).ok_or_else(|| {
            malformed(format!("volume '{}' is not a non-negative integer", cell(columns.volume)))
        })?,
    })
}

fn parse_volume(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    let v: f64 = raw.parse().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Some(v as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Result<Vec<PriceBar>, LoadError> {
        parse_prices(csv.as_bytes(), Path::new("prices.csv"))
    }

    #[test]
    fn test_parse_vendor_export_sorted() {
        let csv = "Date,Open,High,Low,Close,Volume,Dividends,Stock Splits\n\
                   2024-03-04 00:00:00-05:00,20.5,21.0,20.1,20.8,1500000,0.0,0.0\n\
                   2024-03-01 00:00:00-05:00,20.0,20.6,19.8,20.4,1200000.0,0.0,0.0\n";
        let bars = parse(csv).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(bars[0].volume, 1_200_000);
        assert_eq!(bars[1].close, 20.8);
    }

    #[test]
    fn test_columns_case_insensitive_any_order() {
        let csv = "close,volume,date,open,low,high\n10.0,100,2024-01-02,9.5,9.0,10.5\n";
        let bars = parse(csv).unwrap();
        assert_eq!(bars[0].open, 9.5);
        assert_eq!(bars[0].high, 10.5);
        assert_eq!(bars[0].low, 9.0);
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let csv = "Date,Open,High,Low,Close,Volume\n\
                   2024-01-02,1,1,1,1,10\n\
                   2024-01-03,1,1,1,1,10\n\
                   2024-01-02,2,2,2,2,20\n";
        match parse(csv) {
            Err(LoadError::DuplicateDate { date, .. }) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            }
            other => panic!("expected duplicate date error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column() {
        let csv = "Date,Open,High,Low,Close\n2024-01-02,1,1,1,1\n";
        assert!(matches!(parse(csv), Err(LoadError::Malformed { line: 1, .. })));
    }

    #[test]
    fn test_bad_cells_report_line() {
        let csv = "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,1,10\n2024-01-03,1,1,1,-4,10\n";
        assert!(matches!(parse(csv), Err(LoadError::Malformed { line: 3, .. })));

        let csv = "Date,Open,High,Low,Close,Volume\nyesterday,1,1,1,1,10\n";
        assert!(matches!(parse(csv), Err(LoadError::Malformed { .. })));

        let csv = "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,1,10.5\n";
        assert!(matches!(parse(csv), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(parse("Date,Open,High,Low,Close,Volume\n"), Err(LoadError::Empty { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = read_price_file(Path::new("/nonexistent/prices.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Missing { .. }));
    }
}
