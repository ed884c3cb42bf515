//! Trade tape export (CSV).

use anyhow::{Context, Result};
use klinelab_core::domain::{format_micros, Trade};
use std::path::Path;

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;

    writer.write_record([
        "opened_at",
        "closed_at",
        "entry_price",
        "exit_price",
        "size",
        "gross_pnl",
        "commission",
        "pnl",
        "return_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for trade in trades {
        writer.write_record([
            format_micros(trade.opened_at),
            format_micros(trade.closed_at),
            format!("{:.8}", trade.entry_price),
            format!("{:.8}", trade.exit_price),
            format!("{:.8}", trade.size),
            format!("{:.4}", trade.gross_pnl),
            format!("{:.4}", trade.commission),
            format!("{:.4}", trade.pnl),
            format!("{:.4}", trade.return_pct() * 100.0),
            trade.bars_held.to_string(),
            trade.exit_reason.to_string(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush trades CSV {}", path.display()))?;
    Ok(())
}
