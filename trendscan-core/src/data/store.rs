//! Flat-file price store: one CSV per instrument.
//!
//! Layout: `{data_dir}/{code}.csv` with header `date,open,high,low,close,volume`.
//!
//! - Missing file → empty series (never an error)
//! - Atomic writes (write to .tmp, rename into place)
//! - Strict load: a row that does not parse, or carries a NaN price or a
//!   negative volume, marks the whole file corrupt
//! - The resume point is derived from the file itself; there is no separate
//!   checkpoint record to drift out of sync

use super::provider::DataError;
use crate::domain::{PriceBar, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Raw CSV row. Dates stay strings here so legacy formats can be accepted.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// The per-instrument price store.
#[derive(Debug, Clone)]
pub struct PriceStore {
    data_dir: PathBuf,
}

impl PriceStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the series file for a code: `{data_dir}/{code}.csv`
    pub fn series_path(&self, code: &str) -> PathBuf {
        self.data_dir.join(format!("{code}.csv"))
    }

    /// Load the stored series for `code`. An absent file is an empty series.
    pub fn load(&self, code: &str) -> Result<PriceSeries, DataError> {
        let path = self.series_path(code);
        let file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PriceSeries::empty()),
            Err(e) => return Err(DataError::StoreIo { path, source: e }),
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| DataError::StoreCorrupt {
                path: path.clone(),
                reason: format!("row {}: {e}", i + 1),
            })?;
            let date = parse_date(&row.date).ok_or_else(|| DataError::StoreCorrupt {
                path: path.clone(),
                reason: format!("row {}: bad date '{}'", i + 1, row.date),
            })?;
            let bar = PriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            };
            if bar.is_void() {
                return Err(DataError::StoreCorrupt {
                    path,
                    reason: format!("row {}: NaN price or negative volume on {date}", i + 1),
                });
            }
            bars.push(bar);
        }

        // Normalizes caches written out of order or with repeated dates.
        Ok(PriceSeries::from_bars(bars))
    }

    /// Union of the stored series and `incoming`; incoming wins on shared dates.
    ///
    /// Pure with respect to the store: nothing is written until `persist`.
    pub fn merge(&self, code: &str, incoming: &PriceSeries) -> Result<PriceSeries, DataError> {
        Ok(self.load(code)?.merge(incoming))
    }

    /// Atomically replace the stored series for `code`.
    pub fn persist(&self, code: &str, series: &PriceSeries) -> Result<(), DataError> {
        if series.is_empty() {
            return Err(DataError::ValidationError(format!(
                "refusing to persist empty series for {code}"
            )));
        }

        fs::create_dir_all(&self.data_dir).map_err(|e| DataError::StoreIo {
            path: self.data_dir.clone(),
            source: e,
        })?;

        let path = self.series_path(code);
        let tmp_path = path.with_extension("csv.tmp");

        write_series(&tmp_path, series)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::StoreIo {
                path: path.clone(),
                source: e,
            }
        })
    }

    /// Last stored date for `code`, if any.
    pub fn last_date(&self, code: &str) -> Result<Option<NaiveDate>, DataError> {
        Ok(self.load(code)?.last_date())
    }

    /// Where the next fetch for `code` should start.
    pub fn resume_date(&self, code: &str, floor: NaiveDate) -> Result<NaiveDate, DataError> {
        Ok(self.load(code)?.resume_date(floor))
    }

    /// Presence and date range for each code. Unreadable files report `corrupt`.
    pub fn status(&self, codes: &[&str]) -> Vec<SeriesStatus> {
        codes
            .iter()
            .map(|code| match self.load(code) {
                Ok(series) => SeriesStatus {
                    code: code.to_string(),
                    cached: !series.is_empty(),
                    corrupt: false,
                    first_date: series.first_date(),
                    last_date: series.last_date(),
                    bar_count: series.len(),
                },
                Err(_) => SeriesStatus {
                    code: code.to_string(),
                    cached: true,
                    corrupt: true,
                    first_date: None,
                    last_date: None,
                    bar_count: 0,
                },
            })
            .collect()
    }
}

/// Cache status for a single code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStatus {
    pub code: String,
    pub cached: bool,
    pub corrupt: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub bar_count: usize,
}

fn write_series(path: &Path, series: &PriceSeries) -> Result<(), DataError> {
    let io_err = |e: std::io::Error| DataError::StoreIo {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_to_store_err(path, e))?;
    for bar in series.bars() {
        writer
            .serialize(bar)
            .map_err(|e| csv_to_store_err(path, e))?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

fn csv_to_store_err(path: &Path, e: csv::Error) -> DataError {
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => DataError::StoreIo {
            path: path.to_path_buf(),
            source,
        },
        _ => DataError::StoreCorrupt {
            path: path.to_path_buf(),
            reason,
        },
    }
}

/// Accepts `2024-01-02`, `20240102` and `2024-01-02 00:00:00`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let day = s.split(|c: char| c == ' ' || c == 'T').next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y%m%d"))
        .ok()
}
