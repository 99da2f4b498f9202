//! Batch maintenance jobs for the cold-caller dental registry.
//!
//! Three independent jobs share the SQLite registry as the system of record:
//!
//! - `repair_cities` rewrites corrupted Cyrillic city names inside the
//!   JSON-encoded `cities_served` and `locations` columns. The transform is
//!   idempotent, so the job is safe to re-run unconditionally.
//! - `verify_alignment` cross-checks the registry against the callers' Excel
//!   client lists and the exported master JSON, read-only.
//! - `sync_export` regenerates `master_dentists.json` from the registry,
//!   keeping one backup of the previous snapshot.

pub mod callers;
pub mod config;
pub mod db;
pub mod export;
pub mod fields;
pub mod normalize;
pub mod reconcile;
pub mod repair;
pub mod spreadsheet;
