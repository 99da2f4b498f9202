//! Regenerates `master_dentists.json` from the registry, keeping one backup
//! of the previous snapshot.

use coldcall_tools::config::Config;
use coldcall_tools::db::RegistryDb;
use coldcall_tools::export::sync_export;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("export sync failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let db = RegistryDb::open(&config.db_path())?;

    let summary = sync_export(&db, &config)?;

    println!("Export sync");
    println!("  records exported:  {}", summary.exported);
    println!("  previous snapshot: {}", if summary.backed_up { "backed up" } else { "none" });
    println!("  malformed fields:  {}", summary.malformed_fields);
    Ok(())
}
