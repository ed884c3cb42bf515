//! Binance Vision daily kline archives.
//!
//! Each day lives at `{base}/{symbol}/{interval}/{symbol}-{interval}-{day}.zip`
//! and holds a single headerless CSV. The archive is written next to the
//! cache, extracted, and always removed afterwards.

use super::provider::{daily_file_name, DataError, KlineSource};
use crate::domain::Interval;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://data.binance.vision/data/spot/daily/klines";

pub struct BinanceVisionSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BinanceVisionSource {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the source at a mirror.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn archive_url(&self, symbol: &str, interval: Interval, day: NaiveDate) -> String {
        format!(
            "{}/{symbol}/{interval}/{symbol}-{interval}-{}.zip",
            self.base_url,
            day.format("%Y-%m-%d")
        )
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), DataError> {
        let network = |e: reqwest::Error| DataError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = self.client.get(url).send().map_err(network)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::NotAvailable {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().map_err(network)?;
        fs::write(dest, &bytes).map_err(|e| DataError::io(dest, e))
    }
}

impl KlineSource for BinanceVisionSource {
    fn name(&self) -> &str {
        "binance-vision"
    }

    fn fetch_day(
        &self,
        symbol: &str,
        interval: Interval,
        day: NaiveDate,
        dest_dir: &Path,
    ) -> Result<PathBuf, DataError> {
        let url = self.archive_url(symbol, interval, day);
        let csv_name = daily_file_name(symbol, interval, day);
        let zip_path = dest_dir.join(csv_name.replace(".csv", ".zip"));

        let outcome = self
            .download(&url, &zip_path)
            .and_then(|()| extract_csv(&zip_path, dest_dir, &csv_name));

        if zip_path.exists() {
            if let Err(e) = fs::remove_file(&zip_path) {
                tracing::warn!(path = %zip_path.display(), error = %e, "failed to remove archive");
            }
        }
        outcome
    }
}

/// Extract the CSV named `csv_name` (or the archive's only CSV) into `dest_dir`.
///
/// Writes to a `.part` file first so a failed extraction never looks cached.
pub fn extract_csv(zip_path: &Path, dest_dir: &Path, csv_name: &str) -> Result<PathBuf, DataError> {
    let file = File::open(zip_path).map_err(|e| DataError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| DataError::Archive(format!("{}: {e}", zip_path.display())))?;

    let mut index = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| DataError::Archive(e.to_string()))?;
        let name = entry.name().rsplit('/').next().unwrap_or_default().to_string();
        if name == csv_name {
            index = Some(i);
            break;
        }
        if index.is_none() && name.ends_with(".csv") {
            index = Some(i);
        }
    }
    let index = index.ok_or_else(|| {
        DataError::Archive(format!("{} contains no CSV", zip_path.display()))
    })?;

    let target = dest_dir.join(csv_name);
    let partial = dest_dir.join(format!("{csv_name}.part"));
    let result = (|| {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| DataError::Archive(e.to_string()))?;
        let mut out = File::create(&partial).map_err(|e| DataError::io(&partial, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| DataError::io(&partial, e))?;
        fs::rename(&partial, &target).map_err(|e| DataError::io(&target, e))
    })();
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result.map(|()| target)
}
