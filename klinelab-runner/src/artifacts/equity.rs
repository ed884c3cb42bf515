//! Equity curve export (CSV).

use anyhow::{Context, Result};
use klinelab_core::domain::format_micros;
use klinelab_core::engine::EquityPoint;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "time,equity")?;
    for point in equity {
        writeln!(out, "{},{:.4}", format_micros(point.time), point.equity)?;
    }
    out.flush()?;
    Ok(())
}
