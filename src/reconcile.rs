//! Read-only alignment check across the three views of the client base:
//! the registry, the callers' Excel lists, and the exported master JSON.
//!
//! Every view is indexed by the shared facility-name key and compared in
//! both directions per caller, plus a store-vs-export caller comparison.
//! Nothing here mutates any source; the output is a report.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::callers::{CallerDirectory, CallerError, CALLER_CODES};
use crate::config::Config;
use crate::db::{DbError, RegistryDb};
use crate::normalize::name_key;
use crate::spreadsheet::{load_caller_names, SpreadsheetError};

/// How many example names each mismatch category carries in the report.
const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Caller(#[from] CallerError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("failed to parse export snapshot {path}: {source}")]
    SnapshotParse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}

/// One dentist row as the comparison sees it.
struct StoreEntry {
    caller_id: Option<String>,
}

/// Full alignment report: one block per caller plus the export comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub generated_at: String,
    pub store_rows: usize,
    pub callers: Vec<CallerAlignment>,
    pub export: ExportAlignment,
}

/// Excel-vs-store comparison for one caller, both directions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerAlignment {
    pub code: String,
    /// Distinct names in the caller's Excel lists.
    pub listed: usize,
    /// Registry rows assigned to this caller.
    pub assigned: usize,
    /// Listed in Excel, no registry row with that name.
    pub missing: SampledSet,
    /// Listed in Excel, registry row assigned to someone else (or nobody).
    pub wrong_caller: SampledSet,
    /// Assigned in the registry, absent from the Excel lists.
    pub extra: SampledSet,
}

/// Store-vs-export caller comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAlignment {
    /// Snapshot records whose name also exists in the registry.
    pub compared: usize,
    /// Records whose snapshot caller code disagrees with the registry
    /// assignment. Unassigned on both sides counts as a match.
    pub mismatched: usize,
    /// Whether the snapshot file was present at all.
    pub snapshot_found: bool,
}

/// A count plus a bounded sample of the names behind it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledSet {
    pub count: usize,
    pub sample: Vec<String>,
}

impl SampledSet {
    fn from_names(mut names: Vec<String>) -> Self {
        names.sort();
        let count = names.len();
        names.truncate(SAMPLE_LIMIT);
        SampledSet { count, sample: names }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Run the full alignment check. Reads everything, writes nothing.
pub fn run_alignment_check(db: &RegistryDb, config: &Config) -> Result<AlignmentReport, ReconcileError> {
    let users = db.fetch_users()?;
    let directory = CallerDirectory::resolve(&users)?;

    // Registry view, keyed by normalized facility name.
    let mut store: HashMap<String, StoreEntry> = HashMap::new();
    let assignments = db.fetch_assignments()?;
    let store_rows = assignments.len();
    for row in assignments {
        store.insert(
            name_key(&row.facility_name),
            StoreEntry {
                caller_id: row.preferred_caller_id,
            },
        );
    }

    let mut callers = Vec::new();
    for (code, tag) in CALLER_CODES {
        let listed = load_caller_names(&config.spreadsheet_dir(), tag)?;
        let caller_id = directory
            .id_for(code)
            .unwrap_or_default()
            .to_string();
        callers.push(align_caller(code, &caller_id, &listed, &store));
    }

    let export = compare_export(&config.master_json(), &store, &directory)?;

    Ok(AlignmentReport {
        generated_at: Utc::now().to_rfc3339(),
        store_rows,
        callers,
        export,
    })
}

/// Compare one caller's Excel list against the registry, both directions.
fn align_caller(
    code: &str,
    caller_id: &str,
    listed: &BTreeSet<String>,
    store: &HashMap<String, StoreEntry>,
) -> CallerAlignment {
    let mut missing = Vec::new();
    let mut wrong_caller = Vec::new();

    for name in listed {
        match store.get(name) {
            None => missing.push(name.clone()),
            Some(entry) => {
                if entry.caller_id.as_deref() != Some(caller_id) {
                    wrong_caller.push(name.clone());
                }
            }
        }
    }

    let mut assigned = 0;
    let mut extra = Vec::new();
    for (name, entry) in store {
        if entry.caller_id.as_deref() == Some(caller_id) {
            assigned += 1;
            if !listed.contains(name) {
                extra.push(name.clone());
            }
        }
    }

    CallerAlignment {
        code: code.to_string(),
        listed: listed.len(),
        assigned,
        missing: SampledSet::from_names(missing),
        wrong_caller: SampledSet::from_names(wrong_caller),
        extra: SampledSet::from_names(extra),
    }
}

/// Compare the export snapshot's caller codes against the registry.
fn compare_export(
    snapshot_path: &Path,
    store: &HashMap<String, StoreEntry>,
    directory: &CallerDirectory,
) -> Result<ExportAlignment, ReconcileError> {
    if !snapshot_path.exists() {
        log::warn!("export snapshot {} not found, skipping", snapshot_path.display());
        return Ok(ExportAlignment {
            compared: 0,
            mismatched: 0,
            snapshot_found: false,
        });
    }

    let raw = std::fs::read_to_string(snapshot_path).map_err(|e| ReconcileError::SnapshotParse {
        path: snapshot_path.to_path_buf(),
        source: serde_json::Error::io(e),
    })?;
    let records: Vec<Value> =
        serde_json::from_str(&raw).map_err(|source| ReconcileError::SnapshotParse {
            path: snapshot_path.to_path_buf(),
            source,
        })?;

    // Snapshot view: name key -> recorded caller code (None for null).
    let mut snapshot: HashMap<String, Option<String>> = HashMap::new();
    for record in &records {
        let name = record
            .get("name")
            .or_else(|| record.get("facility_name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let code = record
            .get("preferred_caller")
            .and_then(Value::as_str)
            .map(str::to_string);
        snapshot.insert(name_key(name), code);
    }

    let mut compared = 0;
    let mut mismatched = 0;
    for (name, entry) in store {
        let Some(snapshot_code) = snapshot.get(name) else {
            continue;
        };
        compared += 1;

        let store_code = entry
            .caller_id
            .as_deref()
            .and_then(|id| directory.code_for(id));
        if store_code != snapshot_code.as_deref() {
            mismatched += 1;
        }
    }

    Ok(ExportAlignment {
        compared,
        mismatched,
        snapshot_found: true,
    })
}
