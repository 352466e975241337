//! TrendScan CLI: sync, scan, import, universe and cache commands.
//!
//! Commands:
//! - `sync`: incrementally fetch daily bars for the universe into the cache
//! - `scan`: breadth gate, weekly trend scan, dated watchlist CSV
//! - `import`: merge hand-saved vendor payloads into the cache
//! - `universe build`: merge constituent lists into the universe file
//! - `cache status`: per-instrument cache coverage

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trendscan_core::clock::{Clock, SystemClock};
use trendscan_core::data::{
    read_instruments, BreadthSource, CircuitBreaker, EastmoneyBreadth, EastmoneyProvider,
    FixedBreadth, PriceStore, Universe,
};
use trendscan_core::domain::Market;
use trendscan_runner::{
    import_dir, run_scan_job, GateDecision, ScanConfig, ScanOutcome, SyncEngine, SyncOrder,
};

#[derive(Parser)]
#[command(
    name = "trendscan",
    about = "TrendScan CLI: A-share price cache and weekly trend scanner"
)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "trendscan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new daily bars for the universe and merge them into the cache.
    Sync {
        /// Maximum instruments to update in this run.
        #[arg(long)]
        max_per_run: Option<usize>,

        /// Seconds to pause after every fetch.
        #[arg(long)]
        sleep: Option<f64>,

        /// Walk the universe in a date-seeded shuffled order.
        #[arg(long, default_value_t = false)]
        shuffle: bool,

        /// Universe CSV (code,name).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Price cache directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Check market breadth, scan for weekly trend-up crosses, write the watchlist.
    Scan {
        /// Advancing-issue count to use instead of querying the vendor.
        #[arg(long)]
        breadth: Option<u32>,

        /// Skip the breadth gate entirely.
        #[arg(long, default_value_t = false)]
        no_gate: bool,

        /// Run date used to name the watchlist (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Universe CSV (code,name).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Price cache directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Watchlist output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Merge saved kline payloads ({code}.json) into the cache.
    Import {
        /// Directory of saved payloads.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Price cache directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Universe file commands.
    Universe {
        #[command(subcommand)]
        action: UniverseAction,
    },
    /// Cache inspection commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum UniverseAction {
    /// Union constituent CSVs, drop flagged names, sort by code, write the universe.
    Build {
        /// Constituent CSVs, in priority order.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Drop instruments whose name contains this text.
        #[arg(long, default_value = "ST")]
        exclude: String,

        /// Output path. Defaults to the configured universe path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report presence, date range and bar count per instrument.
    Status {
        /// Universe CSV (code,name).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Price cache directory.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ScanConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Sync {
            max_per_run,
            sleep,
            shuffle,
            universe,
            data_dir,
        } => {
            if let Some(n) = max_per_run {
                config.sync.max_per_run = n;
            }
            if let Some(secs) = sleep {
                config.sync.sleep_secs = secs;
            }
            if shuffle {
                config.sync.order = SyncOrder::Shuffle;
            }
            override_paths(&mut config, universe, data_dir, None);
            config.validate()?;
            config.logging.init();
            run_sync(&config)
        }
        Commands::Scan {
            breadth,
            no_gate,
            date,
            universe,
            data_dir,
            output_dir,
        } => {
            if no_gate {
                config.gate.enabled = false;
            }
            override_paths(&mut config, universe, data_dir, output_dir);
            config.logging.init();
            run_scan(&config, breadth, date)
        }
        Commands::Import { dir, data_dir } => {
            if let Some(dir) = dir {
                config.paths.manual_dir = dir;
            }
            override_paths(&mut config, None, data_dir, None);
            config.logging.init();
            run_import(&config)
        }
        Commands::Universe { action } => match action {
            UniverseAction::Build {
                sources,
                exclude,
                output,
            } => {
                config.logging.init();
                let output = output.unwrap_or_else(|| config.paths.universe.clone());
                run_universe_build(&sources, &exclude, output)
            }
        },
        Commands::Cache { action } => match action {
            CacheAction::Status { universe, data_dir } => {
                override_paths(&mut config, universe, data_dir, None);
                config.logging.init();
                run_cache_status(&config)
            }
        },
    }
}

fn override_paths(
    config: &mut ScanConfig,
    universe: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) {
    if let Some(p) = universe {
        config.paths.universe = p;
    }
    if let Some(p) = data_dir {
        config.paths.data_dir = p;
    }
    if let Some(p) = output_dir {
        config.paths.output_dir = p;
    }
}

fn load_universe(config: &ScanConfig) -> Result<Universe> {
    Universe::from_file(&config.paths.universe).context("loading universe")
}

fn run_sync(config: &ScanConfig) -> Result<()> {
    let universe = load_universe(config)?;
    let store = PriceStore::new(&config.paths.data_dir);
    let provider = EastmoneyProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    let clock = SystemClock;

    let summary = SyncEngine::new(&store, &provider, &clock, config.sync.clone())
        .run(&universe)
        .context("sync aborted")?;

    println!(
        "Sync: {} updated, {} already current, {} empty, {} failed, {} not reached (of {})",
        summary.processed,
        summary.up_to_date,
        summary.empty,
        summary.failed,
        summary.not_reached(),
        summary.total
    );
    for (code, err) in &summary.failures {
        eprintln!("  {code}: {err}");
    }
    Ok(())
}

fn run_scan(config: &ScanConfig, breadth: Option<u32>, date: Option<String>) -> Result<()> {
    let run_date = match date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date '{s}'"))?,
        None => SystemClock.today(),
    };

    let source: Box<dyn BreadthSource> = match breadth {
        Some(n) => Box::new(FixedBreadth(Some(n))),
        None => match EastmoneyBreadth::new() {
            Ok(source) => Box::new(source),
            Err(e) => {
                tracing::warn!(error = %e, "breadth client unavailable");
                Box::new(FixedBreadth(None))
            }
        },
    };

    let universe = load_universe(config)?;
    let store = PriceStore::new(&config.paths.data_dir);

    match run_scan_job(config, &store, &universe, source.as_ref(), run_date)? {
        ScanOutcome::Skipped(decision) => {
            match decision {
                GateDecision::Skip {
                    advancing,
                    threshold,
                } => println!(
                    "Scan skipped: {advancing} advancing is below the threshold of {threshold}"
                ),
                _ => println!("Scan skipped: market breadth unavailable"),
            }
            Ok(())
        }
        ScanOutcome::Completed {
            report, watchlist, ..
        } => {
            let s = &report.summary;
            println!(
                "Scan: {} signals from {} scanned ({} short history, {} inactive, {} missing)",
                s.signals, s.scanned, s.insufficient_history, s.inactive, s.missing
            );
            for r in &report.records {
                println!("  {} {}  close {:.2}  ma {:.2}", r.code, r.name, r.close, r.ma);
            }
            println!("Watchlist: {}", watchlist.display());
            Ok(())
        }
    }
}

fn run_import(config: &ScanConfig) -> Result<()> {
    let store = PriceStore::new(&config.paths.data_dir);
    let summary = import_dir(&config.paths.manual_dir, &store).context("import aborted")?;

    println!(
        "Import: {} merged, {} empty, {} failed (of {} files)",
        summary.imported, summary.empty, summary.failed, summary.files
    );
    for (path, reason) in &summary.failures {
        eprintln!("  {}: {reason}", path.display());
    }
    Ok(())
}

fn run_universe_build(sources: &[PathBuf], exclude: &str, output: PathBuf) -> Result<()> {
    let lists = sources
        .iter()
        .map(|path| {
            read_instruments(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let read: usize = lists.iter().map(Vec::len).sum();

    let universe = Universe::build(lists, exclude);
    universe.write(&output)?;

    println!(
        "Universe: {} instruments from {} rows across {} files -> {}",
        universe.len(),
        read,
        sources.len(),
        output.display()
    );
    Ok(())
}

fn run_cache_status(config: &ScanConfig) -> Result<()> {
    let universe = load_universe(config)?;
    let store = PriceStore::new(&config.paths.data_dir);
    let statuses = store.status(&universe.codes());

    println!("{:<10} {:<12} {:<12} {:>6}", "Code", "First", "Last", "Bars");
    println!("{}", "-".repeat(43));

    let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    let mut cached = 0;
    let mut corrupt = 0;
    for s in &statuses {
        let label = format!("{}.{}", s.code, Market::of(&s.code).suffix());
        if s.corrupt {
            corrupt += 1;
            println!("{label:<10} (corrupt)");
            continue;
        }
        if s.cached {
            cached += 1;
        }
        println!(
            "{:<10} {:<12} {:<12} {:>6}",
            label,
            fmt_date(s.first_date),
            fmt_date(s.last_date),
            s.bar_count
        );
    }

    println!(
        "\n{} of {} instruments cached, {} corrupt ({})",
        cached,
        statuses.len(),
        corrupt,
        store.data_dir().display()
    );
    Ok(())
}
