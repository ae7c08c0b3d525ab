use crate::{LoadError, MarketSnapshot};

/// Anything that can materialize a complete market snapshot for one symbol.
///
/// The engine never fetches data itself; it asks a source for an already
/// collected snapshot and treats a `LoadError` as "analysis unavailable".
pub trait SnapshotSource {
    fn symbol(&self) -> &str;

    fn load(&self) -> Result<MarketSnapshot, LoadError>;
}
