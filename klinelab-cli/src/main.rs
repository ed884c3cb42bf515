//! KlineLab CLI: download and run commands.
//!
//! Commands:
//! - `download`: fill the local daily kline cache from Binance Vision
//! - `run`: execute a backtest from flags and/or a TOML config file

mod obs;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use klinelab_core::data::{BinanceVisionSource, KlineCache, KlineSource};
use klinelab_core::domain::Interval;
use klinelab_core::engine::CommissionMode;
use klinelab_runner::{
    load_bars, parse_param_override, run_backtest_from_data, ArtifactManager, BacktestResult,
    LoadOptions, RunConfig, ValidatedRun,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "klinelab", about = "KlineLab CLI: crypto kline backtester")]
struct Cli {
    /// Log level or filter directive (overridden by KLINELAB_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily kline archives into the local cache.
    Download {
        /// Trading pair, e.g. ETHUSDT.
        #[arg(long)]
        symbol: String,

        /// Start date YYYY-MM-DD (inclusive).
        #[arg(long)]
        start: NaiveDate,

        /// End date YYYY-MM-DD (exclusive).
        #[arg(long)]
        end: NaiveDate,

        /// Kline interval, e.g. 1m, 15m, 1h.
        #[arg(long)]
        interval: Interval,

        /// Local data cache directory.
        #[arg(long, default_value = "Data")]
        data_dir: PathBuf,
    },
    /// Run a backtest.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// TOML run configuration; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trading pair, e.g. ETHUSDT.
    #[arg(long)]
    symbol: Option<String>,

    /// Start date YYYY-MM-DD (inclusive).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date YYYY-MM-DD (exclusive).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Local data cache directory [default: Data].
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Timeframe for signal generation (e.g. 15m, 1h).
    #[arg(long)]
    signal_tf: Option<String>,

    /// Finer timeframe for execution and SL/TP (e.g. 1m); data is loaded at
    /// this timeframe and resampled to --signal-tf.
    #[arg(long)]
    granular_tf: Option<String>,

    /// Strategy: ma_cross, oversold_bounce, oversold_bounce_mtf (class names accepted).
    #[arg(long)]
    strategy: Option<String>,

    /// Take-profit as a fraction (0.015 = 1.5%); passed as takeprofit_pct.
    #[arg(long)]
    tp: Option<f64>,

    /// Stop-loss as a fraction (0.006 = 0.6%); passed as stoploss_pct.
    #[arg(long)]
    sl: Option<f64>,

    /// Strategy param override KEY=VALUE; values are auto-typed. Repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Starting cash [default: 10000].
    #[arg(long)]
    cash: Option<f64>,

    /// Leverage multiplier [default: 5].
    #[arg(long)]
    leverage: Option<f64>,

    /// Fraction of cash per trade, before leverage [default: 0.95].
    #[arg(long)]
    position_pct: Option<f64>,

    /// Maker commission rate [default: 0.0002].
    #[arg(long)]
    commission_maker: Option<f64>,

    /// Taker commission rate [default: 0.0005].
    #[arg(long)]
    commission_taker: Option<f64>,

    /// Commission type: maker, taker or blended [default: taker].
    #[arg(long)]
    commission_type: Option<CommissionMode>,

    /// Slippage per fill as a fraction of price [default: 0.0001]; 0 for ideal fills.
    #[arg(long)]
    slippage: Option<f64>,

    /// Use cached files only; never contact the remote source.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Write manifest.json, trades.csv and equity.csv under this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Download {
            symbol,
            start,
            end,
            interval,
            data_dir,
        } => run_download(&symbol, start, end, interval, data_dir),
        Commands::Run(args) => run_backtest_cmd(args),
    }
}

fn run_download(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    interval: Interval,
    data_dir: PathBuf,
) -> Result<()> {
    if start >= end {
        bail!("--start {start} must be before --end {end}");
    }
    let symbol = symbol.to_uppercase();
    let source = BinanceVisionSource::new()?;
    let cache = KlineCache::new(data_dir);

    println!("[data] Ensuring {symbol} {interval} data …");
    let summary = cache.ensure(&source, &symbol, interval, start, end)?;
    println!(
        "[data] {} day(s): {} cached, {} fetched, {} skipped",
        summary.total_days(),
        summary.cached,
        summary.fetched,
        summary.skipped.len()
    );
    for (day, reason) in &summary.skipped {
        eprintln!("[warn] {day}: {reason}");
    }
    if summary.cached + summary.fetched == 0 {
        bail!("no data available for {symbol} {interval} between {start} and {end}");
    }
    Ok(())
}

/// Merge the optional config file with command-line flags.
fn build_run_config(args: &RunArgs) -> Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => {
            let (Some(symbol), Some(start), Some(end), Some(signal_tf), Some(strategy)) = (
                args.symbol.as_ref(),
                args.start,
                args.end,
                args.signal_tf.as_ref(),
                args.strategy.as_ref(),
            ) else {
                bail!("--symbol, --start, --end, --signal-tf and --strategy are required without --config");
            };
            RunConfig::new(symbol, start, end, signal_tf, strategy)
        }
    };

    if let Some(v) = &args.symbol {
        cfg.symbol = v.clone();
    }
    if let Some(v) = args.start {
        cfg.start_date = v;
    }
    if let Some(v) = args.end {
        cfg.end_date = v;
    }
    if let Some(v) = &args.signal_tf {
        cfg.signal_interval = v.clone();
    }
    if let Some(v) = &args.granular_tf {
        cfg.granular_interval = Some(v.clone());
    }
    if let Some(v) = &args.strategy {
        cfg.strategy = v.clone();
    }
    if let Some(v) = &args.data_dir {
        cfg.data_dir = v.clone();
    }
    cfg.take_profit_pct = args.tp.or(cfg.take_profit_pct);
    cfg.stop_loss_pct = args.sl.or(cfg.stop_loss_pct);
    for item in &args.params {
        let (key, value) = parse_param_override(item)?;
        cfg.params.insert(key, value);
    }
    if let Some(v) = args.cash {
        cfg.starting_cash = v;
    }
    if let Some(v) = args.leverage {
        cfg.leverage = v;
    }
    if let Some(v) = args.position_pct {
        cfg.position_fraction = v;
    }
    if let Some(v) = args.commission_maker {
        cfg.commission_maker_rate = v;
    }
    if let Some(v) = args.commission_taker {
        cfg.commission_taker_rate = v;
    }
    if let Some(v) = args.commission_type {
        cfg.commission_mode = v;
    }
    if let Some(v) = args.slippage {
        cfg.slippage_rate = v;
    }
    Ok(cfg)
}

fn run_backtest_cmd(args: RunArgs) -> Result<()> {
    let config = build_run_config(&args)?;
    let run = config.validate()?;
    for warning in &run.warnings {
        println!("[warn] {warning}");
    }

    let source = if args.offline {
        None
    } else {
        Some(BinanceVisionSource::new()?)
    };
    let source_ref = source.as_ref().map(|s| s as &dyn KlineSource);

    println!("[data] Ensuring {} {} data …", run.symbol, run.data_interval());
    let loaded = load_bars(
        &run,
        source_ref,
        &LoadOptions {
            offline: args.offline,
        },
    )?;

    print_header(&config, &run);
    let result = run_backtest_from_data(&config, &run, &loaded);
    print_summary(&result);

    if let Some(dir) = &args.output_dir {
        let manager = ArtifactManager::new(dir)?;
        let paths = manager
            .save_run(&result)
            .with_context(|| format!("saving artifacts under {}", dir.display()))?;
        println!(
            "Artifacts saved to: {}",
            paths.manifest.parent().unwrap_or(dir.as_path()).display()
        );
    }
    Ok(())
}

fn rule() -> String {
    "=".repeat(50)
}

fn print_header(config: &RunConfig, run: &ValidatedRun) {
    println!("\n{}", rule());
    println!(" Symbol       : {}", run.symbol);
    println!(" Period       : {} → {}", run.start, run.end);
    println!(" Signal TF    : {}", run.signal_interval);
    if let Some(granular) = run.granular_interval {
        println!(" Granular TF  : {granular}");
    }
    println!(" Strategy     : {}", run.kind());
    let overrides = explicit_params(config, run);
    if !overrides.is_empty() {
        println!(" Params       : {{{overrides}}}");
    }
    println!(" Leverage     : {}x", run.engine.broker.leverage);
    println!(
        " Slippage     : {:.3}%",
        run.engine.broker.costs.slippage.rate * 100.0
    );
    println!(
        " Starting cash: {}",
        format_money(run.engine.broker.starting_cash)
    );
    println!("{}\n", rule());
}

/// Parameters set explicitly by the user, as applied.
fn explicit_params(config: &RunConfig, run: &ValidatedRun) -> String {
    let mut names: Vec<&str> = config.params.keys().map(String::as_str).collect();
    for (set, name) in [
        (config.take_profit_pct.is_some(), klinelab_core::strategy::TAKE_PROFIT),
        (config.stop_loss_pct.is_some(), klinelab_core::strategy::STOP_LOSS),
    ] {
        if set && run.kind().declares(name) && !names.contains(&name) {
            names.push(name);
        }
    }
    names.sort_unstable();
    names
        .iter()
        .filter_map(|n| run.params.get(*n).map(|v| format!("'{n}': {v}")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let sharpe = m
        .sharpe
        .map(|s| format!("{s:.3}"))
        .unwrap_or_else(|| "N/A".to_string());

    println!("\n{}", rule());
    println!(" RESULTS");
    println!("{}", rule());
    println!(" Ending cash   : {}", format_money(m.ending_equity));
    println!(" Total return  : {:+.2}%", m.total_return_pct);
    println!(
        " Trades        : {}  (won {} / lost {})",
        m.trades.total, m.trades.won, m.trades.lost
    );
    println!(" Win rate      : {:.1}%", m.trades.win_rate);
    println!(" Max drawdown  : {:.2}%", m.max_drawdown_pct);
    println!(" Sharpe ratio  : {sharpe}");
    if m.open_trades > 0 {
        println!(" Open position : {} (not closed at end of data)", m.open_trades);
    }
    if result.margin_rejections > 0 {
        println!(" Margin rejects: {}", result.margin_rejections);
    }
    println!("{}\n", rule());

    for warning in &result.warnings {
        println!("[warn] {warning}");
    }
}

/// `$12,345.67` style, with a leading minus for negatives.
fn format_money(value: f64) -> String {
    let cents = format!("{:.2}", value.abs());
    let (int_part, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}
