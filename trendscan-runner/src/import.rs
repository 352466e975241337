//! Manual import of saved vendor payloads.
//!
//! When the vendor blocks automated access, kline responses can be saved by
//! hand as `{manual_dir}/{code}.json`. Import parses each with the same kline
//! parser the provider uses and merges into the store. Re-running is a no-op
//! for payloads already merged. An unreadable or malformed payload is
//! skipped; a failing store aborts.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendscan_core::data::{parse_kline_payload, DataError, PriceStore};
use trendscan_core::domain::normalize_code;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot list manual payloads in {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("price store failure for {code}: {source}")]
    Store {
        code: String,
        #[source]
        source: DataError,
    },
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub files: usize,
    pub imported: usize,
    pub empty: usize,
    pub failed: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Payload files in `dir`, sorted by name. A missing directory has none.
pub fn payload_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ImportError::ListDir {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Merge every payload in `dir` into `store`.
pub fn import_dir(dir: &Path, store: &PriceStore) -> Result<ImportSummary, ImportError> {
    let files = payload_files(dir)?;
    let mut summary = ImportSummary {
        files: files.len(),
        ..ImportSummary::default()
    };
    tracing::info!(dir = %dir.display(), files = files.len(), "importing manual payloads");

    for path in files {
        let Some(code) = path.file_stem().and_then(|s| s.to_str()).map(normalize_code) else {
            summary.failed += 1;
            summary.failures.push((path, "file name is not a code".into()));
            continue;
        };

        let parsed = fs::read_to_string(&path)
            .map_err(|e| DataError::Other(format!("read {}: {e}", path.display())))
            .and_then(|body| parse_kline_payload(&code, &body));
        let incoming = match parsed {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "payload skipped");
                summary.failed += 1;
                summary.failures.push((path, e.to_string()));
                continue;
            }
        };

        if incoming.is_empty() {
            tracing::warn!(code = %code, "payload has no bars");
            summary.empty += 1;
            continue;
        }

        let store_err = |source| ImportError::Store {
            code: code.clone(),
            source,
        };
        let merged = store.merge(&code, &incoming).map_err(store_err)?;
        store.persist(&code, &merged).map_err(store_err)?;
        summary.imported += 1;
        tracing::info!(code = %code, bars = merged.len(), last_date = ?merged.last_date(), "imported");
    }

    tracing::info!(
        imported = summary.imported,
        empty = summary.empty,
        failed = summary.failed,
        "import complete"
    );
    Ok(summary)
}
