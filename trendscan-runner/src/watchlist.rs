//! WatchlistSink: the dated watchlist CSV.
//!
//! `{output_dir}/watchlist_{YYYY-MM-DD}.csv`, columns `code,name,close,ma20,signal`,
//! UTF-8 with a BOM, prices at two decimals. Same records in, same bytes out.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendscan_core::domain::SignalRecord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER: [&str; 5] = ["code", "name", "close", "ma20", "signal"];

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("cannot write watchlist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode watchlist: {0}")]
    Encode(#[from] csv::Error),
}

#[derive(Debug, Clone)]
pub struct WatchlistSink {
    output_dir: PathBuf,
}

impl WatchlistSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("watchlist_{}.csv", date.format("%Y-%m-%d")))
    }

    /// Write (or overwrite) the watchlist for `date`. Returns the file path.
    pub fn write(&self, date: NaiveDate, records: &[SignalRecord]) -> Result<PathBuf, WatchlistError> {
        let path = self.path_for(date);
        let bytes = render(records)?;

        let io_err = |path: &Path, source: std::io::Error| WatchlistError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.output_dir).map_err(|e| io_err(&self.output_dir, e))?;

        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| io_err(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(&path, e)
        })?;

        tracing::info!(path = %path.display(), records = records.len(), "watchlist written");
        Ok(path)
    }
}

/// Encode records as watchlist CSV bytes, BOM included.
pub fn render(records: &[SignalRecord]) -> Result<Vec<u8>, WatchlistError> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(HEADER)?;

    for r in records {
        let close = format!("{:.2}", r.close);
        let ma = format!("{:.2}", r.ma);
        wtr.write_record([
            r.code.as_str(),
            r.name.as_str(),
            close.as_str(),
            ma.as_str(),
            r.kind.as_str(),
        ])?;
    }

    wtr.into_inner()
        .map_err(|e| WatchlistError::Encode(csv::Error::from(e.into_error())))
}
