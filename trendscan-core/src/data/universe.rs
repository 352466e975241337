//! Universe: the ordered, deduplicated list of tracked instruments.
//!
//! The run-time universe is a CSV with header `code,name`. `build` produces
//! that file from index-constituent exports: union in the order given, first
//! occurrence of a code wins, flagged names are dropped, result sorted by code.

use crate::domain::Instrument;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("cannot read universe file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write universe file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: no code/name columns in header {header:?}")]
    MissingColumns { path: PathBuf, header: Vec<String> },

    #[error("universe file {path} lists no instruments")]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    instruments: Vec<Instrument>,
}

impl Universe {
    /// Build from instruments in order, keeping the first occurrence of each code.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut seen = HashSet::new();
        let instruments = instruments
            .into_iter()
            .filter(|i| seen.insert(i.code.clone()))
            .collect();
        Self { instruments }
    }

    /// Load the run-time universe file. An empty file is an error: nothing could run.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let universe = Self::new(read_instruments(path)?);
        if universe.is_empty() {
            return Err(UniverseError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(universe)
    }

    /// Union of constituent lists, deduplicated by code, names containing
    /// `exclude` removed, sorted by code.
    pub fn build(sources: Vec<Vec<Instrument>>, exclude: &str) -> Self {
        let merged = Self::new(sources.into_iter().flatten());
        let mut kept: Vec<Instrument> = merged
            .instruments
            .into_iter()
            .filter(|i| exclude.is_empty() || !i.name.contains(exclude))
            .collect();
        kept.sort_by(|a, b| a.code.cmp(&b.code));
        Self { instruments: kept }
    }

    /// Atomically write as `code,name` CSV with a UTF-8 BOM (temp file, then rename).
    pub fn write(&self, path: &Path) -> Result<(), UniverseError> {
        let write_err = |source: std::io::Error| UniverseError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut buf = UTF8_BOM.to_vec();
        {
            let mut wtr = csv::Writer::from_writer(&mut buf);
            let mut push = |rec: [&str; 2]| {
                wtr.write_record(rec)
                    .map_err(|e| write_err(std::io::Error::other(e)))
            };
            push(["code", "name"])?;
            for inst in &self.instruments {
                push([inst.code.as_str(), inst.name.as_str()])?;
            }
            wtr.flush().map_err(write_err)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &buf).map_err(write_err)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            write_err(e)
        })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.code.as_str()).collect()
    }
}

/// Read `code`/`name` pairs from a CSV.
///
/// Accepts the plain `code,name` header and vendor constituent exports whose
/// columns end in 代码 (code) and 名称/简称 (name).
pub fn read_instruments(path: &Path) -> Result<Vec<Instrument>, UniverseError> {
    let read_err = |source: csv::Error| UniverseError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::Reader::from_path(path).map_err(read_err)?;
    let header: Vec<String> = rdr
        .headers()
        .map_err(read_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let code_col = header
        .iter()
        .position(|h| h == "code" || h.ends_with("代码"));
    let name_col = header
        .iter()
        .position(|h| h == "name" || h.ends_with("名称") || h.ends_with("简称"));
    let (code_col, name_col) = match (code_col, name_col) {
        (Some(c), Some(n)) => (c, n),
        _ => {
            return Err(UniverseError::MissingColumns {
                path: path.to_path_buf(),
                header,
            })
        }
    };

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(read_err)?;
        let code = record.get(code_col).unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        out.push(Instrument::new(code, record.get(name_col).unwrap_or("")));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(code: &str, name: &str) -> Instrument {
        Instrument::new(code, name)
    }

    #[test]
    fn dedups_keeping_first() {
        let u = Universe::new(vec![inst("000001", "A"), inst("000002", "B"), inst("1", "A2")]);
        assert_eq!(u.len(), 2);
        assert_eq!(u.instruments()[0].name, "A");
    }

    #[test]
    fn build_unions_filters_and_sorts() {
        let hs300 = vec![inst("600519", "贵州茅台"), inst("000001", "平安银行")];
        let dividend = vec![inst("000001", "平安银行"), inst("600028", "ST 示例"), inst("601088", "中国神华")];

        let u = Universe::build(vec![hs300, dividend], "ST");
        assert_eq!(u.codes(), vec!["000001", "600519", "601088"]);
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe/final_universe.csv");
        let u = Universe::new(vec![inst("000001", "平安银行"), inst("600519", "贵州茅台")]);

        u.write(&path).unwrap();
        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM));

        let loaded = Universe::from_file(&path).unwrap();
        assert_eq!(loaded, u);
    }

    #[test]
    fn write_replaces_existing_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_universe.csv");
        fs::write(&path, "code,name\n000009,stale\n000010,stale\n000011,stale\n").unwrap();

        let u = Universe::new(vec![inst("600519", "贵州茅台")]);
        u.write(&path).unwrap();

        assert_eq!(Universe::from_file(&path).unwrap(), u);
        assert!(!path.with_extension("csv.tmp").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn reads_vendor_constituent_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hs300.csv");
        fs::write(&path, "品种代码,品种名称,纳入日期\n1,平安银行,2005-04-08\n600519,贵州茅台,2005-04-08\n").unwrap();

        let list = read_instruments(&path).unwrap();
        assert_eq!(list[0].code, "000001");
        assert_eq!(list[1].name, "贵州茅台");
    }

    #[test]
    fn missing_columns_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "ticker,label\nX,Y\n").unwrap();
        assert!(matches!(
            read_instruments(&path),
            Err(UniverseError::MissingColumns { .. })
        ));
    }

    #[test]
    fn missing_or_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Universe::from_file(&dir.path().join("absent.csv")).is_err());

        let path = dir.path().join("empty.csv");
        fs::write(&path, "code,name\n").unwrap();
        assert!(matches!(
            Universe::from_file(&path),
            Err(UniverseError::Empty { .. })
        ));
    }
}
