//! data-loader: read a persisted market snapshot from the data store.
//!
//! The collector writes, per subject symbol:
//!   <dir>/<prefix>_daily_prices.csv     daily OHLCV table
//!   <dir>/<prefix>_company_info.json    flat fundamentals object
//!   <dir>/peer_comparison_data.json     symbol -> peer record
//! and optionally one `<SYMBOL>.csv` per peer in a peer price directory.

pub mod fundamentals;
pub mod prices;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use analysis_core::{LoadError, MarketSnapshot, PriceBar, SnapshotSource};

pub use fundamentals::{read_fundamentals, read_peer_set};
pub use prices::{parse_prices, read_price_file};

/// Locations of the input files for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub prices: PathBuf,
    pub fundamentals: PathBuf,
    pub peers: PathBuf,
    pub peer_prices_dir: Option<PathBuf>,
}

impl DataPaths {
    /// Conventional layout inside a raw-data directory.
    ///
    /// The file prefix is the lowercased symbol without its exchange suffix,
    /// so `ABX.TO` reads `abx_daily_prices.csv`.
    pub fn in_dir(dir: impl AsRef<Path>, symbol: &str) -> Self {
        let dir = dir.as_ref();
        let prefix = symbol.split('.').next().unwrap_or(symbol).to_lowercase();
        Self {
            prices: dir.join(format!("{prefix}_daily_prices.csv")),
            fundamentals: dir.join(format!("{prefix}_company_info.json")),
            peers: dir.join("peer_comparison_data.json"),
            peer_prices_dir: None,
        }
    }

    pub fn with_peer_prices(mut self, dir: impl Into<PathBuf>) -> Self {
        self.peer_prices_dir = Some(dir.into());
        self
    }
}

/// Snapshot source backed by files on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    symbol: String,
    paths: DataPaths,
}

impl FileSnapshotSource {
    pub fn new(symbol: impl Into<String>, paths: DataPaths) -> Self {
        Self {
            symbol: symbol.into(),
            paths,
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    fn load_peer_bars(&self, dir: &Path, symbols: impl Iterator<Item = String>) -> Result<HashMap<String, Vec<PriceBar>>, LoadError> {
        let mut peer_bars = HashMap::new();
        for symbol in symbols {
            let path = dir.join(format!("{symbol}.csv"));
            match read_price_file(&path) {
                Ok(bars) => {
                    tracing::debug!(symbol = %symbol, bars = bars.len(), "Loaded peer price history");
                    peer_bars.insert(symbol, bars);
                }
                Err(LoadError::Missing { .. }) => {
                    tracing::debug!(symbol = %symbol, path = %path.display(), "No peer price history, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(peer_bars)
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn load(&self) -> Result<MarketSnapshot, LoadError> {
        let bars = read_price_file(&self.paths.prices)?;
        let fundamentals = read_fundamentals(&self.paths.fundamentals)?;
        let peers = read_peer_set(&self.paths.peers)?;

        let peer_bars = match &self.paths.peer_prices_dir {
            Some(dir) => self.load_peer_bars(dir, peers.keys().cloned())?,
            None => HashMap::new(),
        };

        tracing::info!(
            symbol = %self.symbol,
            bars = bars.len(),
            peers = peers.len(),
            peer_histories = peer_bars.len(),
            "Loaded market snapshot"
        );

        Ok(MarketSnapshot {
            symbol: self.symbol.clone(),
            bars,
            fundamentals,
            peers,
            peer_bars,
        })
    }
}
