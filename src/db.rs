//! SQLite access for the cold-caller registry.
//!
//! The database (`data/cold-caller.db`) is owned by the web app; its schema
//! is created and migrated there. This crate opens one connection per batch
//! run, reads, and for the repair pass writes inside a single transaction.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Registry database not found at {0}")]
    DatabaseNotFound(PathBuf),
}

/// A full row from the `dentists` table, JSON columns kept as raw text.
#[derive(Debug, Clone)]
pub struct DbDentist {
    pub id: String,
    pub facility_name: String,
    pub region: String,
    pub manager: Option<String>,
    pub phones: Option<String>,
    pub services: Option<String>,
    pub cities_served: Option<String>,
    pub locations: Option<String>,
    pub staff: Option<String>,
    pub wants_implants: bool,
    pub eik: Option<String>,
    pub preferred_caller_id: Option<String>,
    pub created_at: String,
}

/// The slice of a dentist row the reconciliation cares about.
#[derive(Debug, Clone)]
pub struct DentistAssignment {
    pub id: String,
    pub facility_name: String,
    pub preferred_caller_id: Option<String>,
}

/// A row from the `users` table (callers and admins).
#[derive(Debug, Clone)]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
}

/// SQLite connection wrapper for one batch run.
///
/// Intentionally not `Clone`: every job opens its own connection, uses it for
/// the duration of the run and drops it on every exit path.
pub struct RegistryDb {
    conn: Connection,
}

impl RegistryDb {
    /// Open the registry database at `path`. The file must already exist —
    /// this crate never creates the schema.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if !path.exists() {
            return Err(DbError::DatabaseNotFound(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Mutable borrow for jobs that run inside a transaction.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// All dentist rows, fully hydrated, for the export synchronizer.
    pub fn fetch_dentists(&self) -> Result<Vec<DbDentist>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, facility_name, region, manager, phones, services,
                    cities_served, locations, staff, wants_implants, eik,
                    preferred_caller_id, created_at
             FROM dentists
             ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DbDentist {
                id: row.get(0)?,
                facility_name: row.get(1)?,
                region: row.get(2)?,
                manager: row.get(3)?,
                phones: row.get(4)?,
                services: row.get(5)?,
                cities_served: row.get(6)?,
                locations: row.get(7)?,
                staff: row.get(8)?,
                wants_implants: row.get::<_, Option<i64>>(9)?.unwrap_or(0) != 0,
                eik: row.get(10)?,
                preferred_caller_id: row.get(11)?,
                created_at: row.get(12)?,
            })
        })?;

        let mut dentists = Vec::new();
        for row in rows {
            dentists.push(row?);
        }
        Ok(dentists)
    }

    /// Name + caller assignment for every dentist, for reconciliation.
    pub fn fetch_assignments(&self) -> Result<Vec<DentistAssignment>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, facility_name, preferred_caller_id FROM dentists",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DentistAssignment {
                id: row.get(0)?,
                facility_name: row.get(1)?,
                preferred_caller_id: row.get(2)?,
            })
        })?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?);
        }
        Ok(assignments)
    }

    /// Every user row; the caller heuristic runs over all of them.
    pub fn fetch_users(&self) -> Result<Vec<DbUser>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, display_name FROM users")?;

        let rows = stmt.query_map([], |row| {
            Ok(DbUser {
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
            })
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Count of dentist rows, for job summaries.
    pub fn count_dentists(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM dentists", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert a user row. Fixture helper for tests.
    #[cfg(test)]
    pub(crate) fn insert_user(
        &self,
        id: &str,
        username: &str,
        display_name: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, username, display_name) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, username, display_name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testdb {
    //! Minimal fixture schema matching the columns the jobs touch. The real
    //! schema lives in the web app; tests only need these slices.

    use std::path::Path;

    use rusqlite::params;

    use super::{DbError, RegistryDb};

    pub(crate) const SCHEMA: &str = "
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            display_name TEXT
        );
        CREATE TABLE dentists (
            id TEXT PRIMARY KEY,
            facility_name TEXT NOT NULL,
            region TEXT NOT NULL DEFAULT 'СОФИЯ ГРАД',
            manager TEXT,
            phones TEXT,
            services TEXT,
            cities_served TEXT,
            locations TEXT,
            staff TEXT,
            wants_implants INTEGER,
            eik TEXT,
            preferred_caller_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
    ";

    /// Create an empty registry database at `path` and open it.
    pub(crate) fn create_at(path: &Path) -> Result<RegistryDb, DbError> {
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);
        RegistryDb::open(path)
    }

    /// Insert a dentist row with just the fields a test cares about.
    pub(crate) fn insert_dentist(
        db: &RegistryDb,
        id: &str,
        facility_name: &str,
        cities_served: Option<&str>,
        locations: Option<&str>,
        preferred_caller_id: Option<&str>,
    ) {
        db.conn_ref()
            .execute(
                "INSERT INTO dentists
                    (id, facility_name, phones, cities_served, locations,
                     preferred_caller_id, created_at)
                 VALUES (?1, ?2, '[]', ?3, ?4, ?5, '2024-01-15 09:00:00')",
                params![id, facility_name, cities_served, locations, preferred_caller_id],
            )
            .expect("insert dentist fixture");
    }
}
