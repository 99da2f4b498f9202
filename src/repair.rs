//! The city-name repair pass.
//!
//! One transaction covers the whole pass: either every changed row commits or
//! none do, so a crash mid-pass leaves the registry exactly as it was and the
//! pass is simply re-run. Re-running over repaired data changes zero rows —
//! the rules converge (see `normalize`).

use rusqlite::params;
use serde::Serialize;

use crate::db::{DbError, RegistryDb};
use crate::fields::repair_city_fields;
use crate::normalize::CityRules;

/// Summary of one repair pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairSummary {
    /// Rows examined.
    pub scanned: usize,
    /// Rows with at least one rewritten column.
    pub changed: usize,
    /// JSON columns that failed to decode and were skipped.
    pub malformed_fields: usize,
}

/// Run the repair pass over every dentist row.
pub fn run_repair_pass(db: &mut RegistryDb, rules: &CityRules) -> Result<RepairSummary, DbError> {
    let mut summary = RepairSummary::default();
    let tx = db.conn_mut().transaction()?;

    {
        let mut stmt = tx.prepare("SELECT id, cities_served, locations FROM dentists")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut pending = Vec::new();
        for row in rows {
            let (id, cities, locations) = row?;
            summary.scanned += 1;

            let repair = repair_city_fields(rules, cities.as_deref(), locations.as_deref());
            summary.malformed_fields += repair.malformed;
            if repair.changed() {
                pending.push((id, repair));
            }
        }
        drop(stmt);

        for (id, repair) in pending {
            if let Some(cities) = &repair.cities {
                tx.execute(
                    "UPDATE dentists SET cities_served = ?1 WHERE id = ?2",
                    params![cities, id],
                )?;
            }
            if let Some(locations) = &repair.locations {
                tx.execute(
                    "UPDATE dentists SET locations = ?1 WHERE id = ?2",
                    params![locations, id],
                )?;
            }
            summary.changed += 1;
        }
    }

    tx.commit()?;

    log::info!(
        "repair pass: {} rows scanned, {} changed, {} malformed fields skipped",
        summary.scanned,
        summary.changed,
        summary.malformed_fields
    );
    Ok(summary)
}
