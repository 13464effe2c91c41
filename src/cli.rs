//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{build_load_config, validate_load_config, LoadConfig};
use crate::domain::error::RefcacheError;
use crate::domain::market::MarketCache;
use crate::domain::ohlcv::{AppliedPrice, Timeframe};
use crate::domain::refs::{live_counters, Ref, ReferenceCounter, WeakRef};
use crate::domain::storage::PriceStorage;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "refcache", about = "Shared market object cache")]
pub struct Cli {
    /// Log cache and handle activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk one object through strong and weak handle releases
    Scenario,
    /// Load bar data into shared storages and indicators
    Load {
        #[arg(short, long)]
        config: PathBuf,
        /// Load only this code instead of the configured list
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// Validate a load configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);
    let result = match cli.command {
        Command::Scenario => run_scenario(&mut io::stdout().lock()).map_err(RefcacheError::from),
        Command::Load {
            config,
            code,
            exchange,
        } => run_load(&config, code.as_deref(), exchange.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err, &mut io::stderr().lock()),
    }
}

/// Writes one `error:` line for `err` and returns its exit code.
pub fn report_error(err: &RefcacheError, out: &mut dyn Write) -> ExitCode {
    // Nothing is left to report a failed write to.
    let _ = writeln!(out, "error: {err}");
    err.into()
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when called more than once in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, RefcacheError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn run_validate(config_path: &PathBuf) -> Result<(), RefcacheError> {
    let adapter = load_config(config_path)?;
    validate_load_config(&adapter)?;
    println!("{}: ok", config_path.display());
    Ok(())
}

fn run_load(
    config_path: &PathBuf,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> Result<(), RefcacheError> {
    let adapter = load_config(config_path)?;
    let mut config = build_load_config(&adapter)?;
    apply_overrides(&mut config, code_override, exchange_override);

    let data_port = CsvAdapter::new(config.data_path.clone());
    run_load_pipeline(&data_port, &config, &mut io::stdout().lock())?;
    Ok(())
}

pub fn apply_overrides(config: &mut LoadConfig, code: Option<&str>, exchange: Option<&str>) {
    if let Some(code) = code {
        config.codes = vec![code.trim().to_uppercase()];
    }
    if let Some(exchange) = exchange {
        config.exchange = exchange.trim().to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub storages: usize,
    pub indicators: usize,
    pub bars_added: usize,
    pub skipped: Vec<String>,
    /// Storages still reachable through weak observers after shutdown.
    pub alive_after_shutdown: usize,
}

/// Loads every configured code through one [`MarketCache`], prints what the
/// registries hold, then shuts them down.
pub fn run_load_pipeline(
    data_port: &dyn DataPort,
    config: &LoadConfig,
    out: &mut dyn Write,
) -> Result<LoadSummary, RefcacheError> {
    let mut cache = MarketCache::new();
    let mut observers: Vec<WeakRef<PriceStorage>> = Vec::new();
    let mut skipped = Vec::new();
    let mut bars_added = 0;

    for code in &config.codes {
        let bars = match data_port.fetch_ohlcv(
            code,
            &config.exchange,
            config.start_date,
            config.end_date,
        ) {
            Ok(bars) if bars.is_empty() => {
                tracing::warn!(code = %code, "no bars in range, skipping");
                skipped.push(code.clone());
                continue;
            }
            Ok(bars) => bars,
            Err(RefcacheError::NoData { .. }) => {
                tracing::warn!(code = %code, "no data, skipping");
                skipped.push(code.clone());
                continue;
            }
            Err(e) => return Err(e),
        };

        let (storage, added) = cache.load(code, config.timeframe, config.applied_price, &bars);
        bars_added += added;
        for &kind in &config.indicators {
            cache.indicator(code, config.timeframe, config.applied_price, kind);
        }
        if !observers.iter().any(|w| w.ptr() == storage.ptr()) {
            observers.push(storage.downgrade());
        }
    }

    let stats = cache.stats();
    if stats.storages == 0 {
        return Err(RefcacheError::NoData {
            code: config.codes.join(","),
            exchange: config.exchange.clone(),
        });
    }

    writeln!(out, "{:<28} {:>6} {:>8} {:>12}", "storage", "bars", "strong", "last")?;
    for key in cache.storage_keys() {
        let Some(storage) = cache.try_storage(key) else {
            continue;
        };
        if let Some(s) = storage.get() {
            let last = s.last().map_or("-".to_string(), |(_, v)| format!("{v:.4}"));
            // One count is the lookup handle itself.
            writeln!(
                out,
                "{:<28} {:>6} {:>8} {:>12}",
                key,
                s.len(),
                storage.strong_count() - 1,
                last
            )?;
        }
    }
    for key in cache.indicator_keys() {
        if let Some(indicator) = cache.try_indicator(key) {
            let last = indicator
                .last_value()
                .map_or("warmup".to_string(), |v| format!("{v:.4}"));
            writeln!(out, "{:<28} {:>6} {:>8} {:>12}", key, "", "", last)?;
        }
    }
    writeln!(
        out,
        "storages: {}, indicators: {}, live counters on thread: {}",
        stats.storages, stats.indicators, stats.thread_live_counters
    )?;

    let (indicators, storages) = cache.shutdown();
    let alive_after_shutdown = observers.iter().filter(|w| w.object_exists()).count();
    writeln!(
        out,
        "shutdown released {} indicators, {} storages; {} still alive",
        indicators, storages, alive_after_shutdown
    )?;

    Ok(LoadSummary {
        storages: stats.storages,
        indicators: stats.indicators,
        bars_added,
        skipped,
        alive_after_shutdown,
    })
}

fn describe(counter: Option<&ReferenceCounter<PriceStorage>>) -> String {
    match counter {
        Some(c) => format!(
            "({}, {}){}",
            c.strong_count(),
            c.weak_count(),
            if c.is_deleted() { " deleted" } else { "" }
        ),
        None => "none".to_string(),
    }
}

/// Takes one object through two strong handles and one weak handle, printing
/// `(strong, weak)` after every step.
pub fn run_scenario(out: &mut dyn Write) -> io::Result<()> {
    let base = live_counters();

    let mut r1 = Ref::new(PriceStorage::new("X", Timeframe::D1, AppliedPrice::Close));
    writeln!(out, "1. {:<14} counter {}", "r1 = new X", describe(r1.counter()))?;

    let mut r2 = r1.clone();
    writeln!(out, "2. {:<14} counter {}", "r2 = r1", describe(r1.counter()))?;

    let mut w = r1.downgrade();
    writeln!(out, "3. {:<14} counter {}", "w = weak(r1)", describe(r1.counter()))?;

    r1.reset();
    writeln!(
        out,
        "4. {:<14} counter {} exists {}",
        "release r1",
        describe(r2.counter()),
        w.object_exists()
    )?;

    r2.reset();
    writeln!(out, "5. {:<14} counter {}", "release r2", describe(w.counter()))?;

    writeln!(
        out,
        "6. {:<14} exists {} ptr null {}",
        "observe w",
        w.object_exists(),
        w.ptr().is_none()
    )?;

    w.reset();
    writeln!(
        out,
        "7. {:<14} counter {} live counters {}",
        "release w",
        describe(w.counter()),
        live_counters() - base
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_codes_and_exchange() {
        let mut config = LoadConfig {
            data_path: PathBuf::from("d"),
            exchange: "ASX".into(),
            codes: vec!["BHP".into(), "CBA".into()],
            start_date: chrono::NaiveDate::MIN,
            end_date: chrono::NaiveDate::MAX,
            timeframe: Timeframe::D1,
            applied_price: AppliedPrice::Close,
            indicators: vec![],
        };
        apply_overrides(&mut config, Some(" wbc "), Some("NYSE"));
        assert_eq!(config.codes, vec!["WBC"]);
        assert_eq!(config.exchange, "NYSE");

        apply_overrides(&mut config, None, None);
        assert_eq!(config.codes, vec!["WBC"]);
    }

    #[test]
    fn error_is_reported_once() {
        let err = RefcacheError::NoData {
            code: "BHP".into(),
            exchange: "ASX".into(),
        };
        let mut out: Vec<u8> = Vec::new();
        let code = report_error(&err, &mut out);

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "error: no data for BHP on ASX\n"
        );
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(5)));
    }
}
