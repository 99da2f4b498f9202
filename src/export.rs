//! Registry → `master_dentists.json` synchronizer.
//!
//! The master JSON is a derived artifact: every sync rewrites it wholesale
//! from the registry, keeping exactly one backup of the previous version.
//! The write is atomic (temp file in the same directory, then rename), so a
//! failed sync leaves both the snapshot and its backup as they were.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::callers::{CallerDirectory, CallerError};
use crate::config::Config;
use crate::db::{DbDentist, DbError, RegistryDb};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Caller(#[from] CallerError),

    #[error("failed to write export snapshot: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize export snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One record of the master JSON, in its external field names.
///
/// Renames relative to the registry columns: `cities_served` → `cities`,
/// `staff` → `dentists`, `services` → `contract_packages`;
/// `preferred_caller` is the resolved short code, not a user id.
#[derive(Debug, Serialize)]
pub struct ExportRecord {
    pub name: String,
    pub region: String,
    pub manager: Option<String>,
    pub phones: Value,
    pub locations: Value,
    pub cities: Value,
    pub dentists: Value,
    pub contract_packages: Value,
    pub preferred_caller: Option<String>,
    pub wants_implants: bool,
    pub eik: Option<String>,
    pub created_at: String,
}

/// Summary of one export sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub exported: usize,
    /// Whether a previous snapshot existed and was saved as the backup.
    pub backed_up: bool,
    /// JSON columns that failed to decode and were exported as empty lists.
    pub malformed_fields: usize,
}

/// Rewrite the master JSON from the registry.
pub fn sync_export(db: &RegistryDb, config: &Config) -> Result<ExportSummary, ExportError> {
    let users = db.fetch_users()?;
    let directory = CallerDirectory::resolve(&users)?;

    let mut summary = ExportSummary::default();
    let mut records = Vec::new();
    for dentist in db.fetch_dentists()? {
        records.push(to_record(dentist, &directory, &mut summary.malformed_fields));
    }
    summary.exported = records.len();

    let snapshot_path = config.master_json();
    if snapshot_path.exists() {
        std::fs::copy(&snapshot_path, config.master_backup())?;
        summary.backed_up = true;
        log::info!("previous snapshot backed up to {}", config.master_backup().display());
    }

    let parent = snapshot_path
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| config.base_dir.clone());
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut tmp, &records)?;
    tmp.write_all(b"\n")?;
    tmp.persist(&snapshot_path).map_err(|e| e.error)?;

    log::info!(
        "exported {} records to {}",
        summary.exported,
        snapshot_path.display()
    );
    Ok(summary)
}

/// Reshape one registry row into the export schema.
fn to_record(
    dentist: DbDentist,
    directory: &CallerDirectory,
    malformed: &mut usize,
) -> ExportRecord {
    let preferred_caller = dentist
        .preferred_caller_id
        .as_deref()
        .and_then(|id| directory.code_for(id))
        .map(str::to_string);

    ExportRecord {
        name: dentist.facility_name,
        region: dentist.region,
        manager: dentist.manager,
        phones: decode_list(dentist.phones.as_deref(), malformed),
        locations: decode_list(dentist.locations.as_deref(), malformed),
        cities: decode_list(dentist.cities_served.as_deref(), malformed),
        dentists: decode_list(dentist.staff.as_deref(), malformed),
        contract_packages: decode_list(dentist.services.as_deref(), malformed),
        preferred_caller,
        wants_implants: dentist.wants_implants,
        eik: dentist.eik,
        created_at: dentist.created_at,
    }
}

/// Decode a JSON column for export. Absent or undecodable values become an
/// empty list; failures are counted, never fatal for the row.
fn decode_list(raw: Option<&str>, malformed: &mut usize) -> Value {
    match raw {
        None => Value::Array(Vec::new()),
        Some(s) if s.trim().is_empty() => Value::Array(Vec::new()),
        Some(s) => match serde_json::from_str(s) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("exporting undecodable column as empty list: {err}");
                *malformed += 1;
                Value::Array(Vec::new())
            }
        },
    }
}
