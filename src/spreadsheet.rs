//! Reads the per-caller client lists out of the source Excel workbooks.
//!
//! Each caller hands over one or more `КЛИЕНТИ <TAG>*.xlsx` files; the only
//! thing the jobs consume is the `Фирма` (company name) column. Names come
//! back already collapsed to the shared index key (see `normalize::name_key`).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;

use crate::normalize::name_key;

/// Header of the one column the jobs read.
const NAME_COLUMN: &str = "Фирма";

/// Filename prefix shared by every caller list workbook.
const LIST_PREFIX: &str = "КЛИЕНТИ";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("workbook {0} has no '{NAME_COLUMN}' column")]
    MissingColumn(PathBuf),
}

/// Load the normalized company names listed for one caller.
///
/// A caller with no matching workbook is an empty list, not an error — the
/// files live outside the repo and are routinely absent on dev machines. A
/// workbook that exists but cannot be read, or lacks the name column, aborts
/// the run.
pub fn load_caller_names(dir: &Path, tag: &str) -> Result<BTreeSet<String>, SpreadsheetError> {
    let files = list_workbooks(dir, tag)?;
    if files.is_empty() {
        log::warn!("no '{LIST_PREFIX} {tag}' workbook found under {}", dir.display());
        return Ok(BTreeSet::new());
    }

    let mut names = BTreeSet::new();
    for path in files {
        log::info!("reading caller list {}", path.display());
        let mut workbook = open_workbook_auto(&path).map_err(|source| SpreadsheetError::Open {
            path: path.clone(),
            source,
        })?;

        let mut found_column = false;
        for sheet_name in workbook.sheet_names().to_vec() {
            if let Ok(range) = workbook.worksheet_range(&sheet_name) {
                if let Some(column_names) = collect_firm_names(range.rows()) {
                    found_column = true;
                    names.extend(column_names.into_iter().map(|n| name_key(&n)));
                }
            }
        }
        if !found_column {
            return Err(SpreadsheetError::MissingColumn(path));
        }
    }

    names.remove("");
    Ok(names)
}

/// Workbooks in `dir` named `КЛИЕНТИ…<tag>….xlsx` for one caller tag.
fn list_workbooks(dir: &Path, tag: &str) -> Result<Vec<PathBuf>, SpreadsheetError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| SpreadsheetError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                return false;
            };
            let is_xlsx = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
            is_xlsx && stem.starts_with(LIST_PREFIX) && stem.contains(tag)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Pull the `Фирма` column out of a sheet: the first row is the header, the
/// rest are values. Returns `None` when the sheet has no such column.
fn collect_firm_names<'a, I>(mut rows: I) -> Option<Vec<String>>
where
    I: Iterator<Item = &'a [Data]>,
{
    let header = rows.next()?;
    let column = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s.trim() == NAME_COLUMN))?;

    let mut names = Vec::new();
    for row in rows {
        match row.get(column) {
            Some(Data::String(s)) if !s.trim().is_empty() => names.push(s.clone()),
            _ => {}
        }
    }
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn collects_the_name_column_only() {
        let sheet = vec![
            vec![s("Град"), s("Фирма"), s("Телефон")],
            vec![s("СОФИЯ"), s("ДЕНТА ПРИМ ООД"), s("0888123456")],
            vec![s("ПЛОВДИВ"), s("Д-Р ИВАНОВ"), Data::Empty],
            vec![Data::Empty, s("   "), Data::Empty],
            vec![Data::Empty, Data::Float(42.0), Data::Empty],
        ];
        let names = collect_firm_names(sheet.iter().map(Vec::as_slice)).expect("column found");
        assert_eq!(names, vec!["ДЕНТА ПРИМ ООД", "Д-Р ИВАНОВ"]);
    }

    #[test]
    fn sheet_without_the_column_yields_none() {
        let sheet = vec![vec![s("Град"), s("Телефон")], vec![s("СОФИЯ"), s("02")]];
        assert!(collect_firm_names(sheet.iter().map(Vec::as_slice)).is_none());
    }

    #[test]
    fn missing_directory_or_files_mean_an_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let names = load_caller_names(&dir.path().join("absent"), "ИЦО").expect("empty");
        assert!(names.is_empty());

        let names = load_caller_names(dir.path(), "ИЦО").expect("empty");
        assert!(names.is_empty());
    }

    #[test]
    fn only_matching_workbooks_are_selected() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "КЛИЕНТИ ИЦО 2024.xlsx",
            "КЛИЕНТИ_ДАНИ.xlsx",
            "КЛИЕНТИ ИЦО стари.XLSX",
            "бележки.txt",
            "ИЦО без префикс.xlsx",
        ] {
            std::fs::write(dir.path().join(name), b"").expect("touch");
        }

        let files = list_workbooks(dir.path(), "ИЦО").expect("list");
        let stems: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(stems, vec!["КЛИЕНТИ ИЦО 2024.xlsx", "КЛИЕНТИ ИЦО стари.XLSX"]);
    }
}
