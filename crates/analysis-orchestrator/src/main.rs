//! investment-thesis: analyze one symbol from the local data store and print
//! the report as JSON.
//!
//! Usage:
//!   cargo run -p analysis-orchestrator -- --symbol ABX.TO
//!   cargo run -p analysis-orchestrator -- --symbol NEM --data-dir data/raw --thesis-only
//!
//! Everything not given on the command line comes from `THESIS_*` variables
//! (a `.env` file is honored).

use analysis_orchestrator::{AnalysisEngine, EngineConfig};
use anyhow::Context;
use data_loader::{DataPaths, FileSnapshotSource};
use std::path::PathBuf;

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "investment_thesis=info,analysis_orchestrator=info,data_loader=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage:");
        eprintln!("  investment-thesis [--symbol SYM] [--data-dir DIR] [--peer-prices DIR] [--thesis-only]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --symbol SYM       Subject symbol (default: THESIS_SYMBOL or ABX.TO)");
        eprintln!("  --data-dir DIR     Raw data directory (default: THESIS_DATA_DIR or data/raw)");
        eprintln!("  --peer-prices DIR  Directory of <SYMBOL>.csv peer histories");
        eprintln!("  --thesis-only      Print only the investment thesis");
        return Ok(());
    }
    let thesis_only = args.iter().any(|a| a == "--thesis-only");

    let mut config = EngineConfig::from_env().context("Invalid THESIS_* configuration")?;
    if let Some(symbol) = arg_value(&args, "--symbol") {
        config.symbol = symbol.to_string();
    }
    if let Some(dir) = arg_value(&args, "--data-dir") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = arg_value(&args, "--peer-prices") {
        config.peer_prices_dir = Some(PathBuf::from(dir));
    }
    config.validate()?;

    let mut paths = DataPaths::in_dir(&config.data_dir, &config.symbol);
    if let Some(dir) = &config.peer_prices_dir {
        paths = paths.with_peer_prices(dir);
    }
    tracing::info!(
        "investment-thesis: symbol={}, data_dir={}, peers={}",
        config.symbol,
        config.data_dir.display(),
        if config.peer_symbols.is_empty() { "all".to_string() } else { config.peer_symbols.join(",") }
    );

    let source = FileSnapshotSource::new(config.symbol.clone(), paths);
    let engine = AnalysisEngine::new(config);
    let report = engine
        .run(&source)
        .with_context(|| format!("Analysis unavailable for {}", engine.config().symbol))?;

    let output = if thesis_only {
        serde_json::to_string_pretty(&report.thesis)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{output}");

    Ok(())
}
