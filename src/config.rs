//! Path layout for one maintenance run.
//!
//! Everything hangs off a single base directory — the web app's project
//! root, where `data/cold-caller.db`, the master JSON and the caller
//! spreadsheets live. The jobs take no CLI flags; set `COLDCALL_DIR` to run
//! them against a different checkout.

use std::path::PathBuf;

/// Environment variable overriding the base directory.
pub const BASE_DIR_ENV: &str = "COLDCALL_DIR";

/// Resolved paths for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
}

impl Config {
    pub fn new(base_dir: PathBuf) -> Self {
        Config { base_dir }
    }

    /// Base directory from `COLDCALL_DIR`, defaulting to the working
    /// directory.
    pub fn from_env() -> Self {
        let base_dir = std::env::var_os(BASE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Config { base_dir }
    }

    /// The registry SQLite database.
    pub fn db_path(&self) -> PathBuf {
        self.base_dir.join("data").join("cold-caller.db")
    }

    /// The exported master snapshot.
    pub fn master_json(&self) -> PathBuf {
        self.base_dir.join("master_dentists.json")
    }

    /// Single-generation backup of the previous snapshot.
    pub fn master_backup(&self) -> PathBuf {
        self.base_dir.join("master_dentists_backup.json")
    }

    /// Where the caller spreadsheets are dropped (the base directory itself).
    pub fn spreadsheet_dir(&self) -> PathBuf {
        self.base_dir.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_base_directory() {
        let config = Config::new(PathBuf::from("/srv/coldcall"));
        assert_eq!(config.db_path(), PathBuf::from("/srv/coldcall/data/cold-caller.db"));
        assert_eq!(
            config.master_json(),
            PathBuf::from("/srv/coldcall/master_dentists.json")
        );
        assert_eq!(
            config.master_backup(),
            PathBuf::from("/srv/coldcall/master_dentists_backup.json")
        );
        assert_eq!(config.spreadsheet_dir(), PathBuf::from("/srv/coldcall"));
    }
}
