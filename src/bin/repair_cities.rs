//! Repairs corrupted city names in the registry. Idempotent; run it as often
//! as needed.

use coldcall_tools::config::Config;
use coldcall_tools::db::RegistryDb;
use coldcall_tools::normalize::CityRules;
use coldcall_tools::repair::run_repair_pass;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("city repair failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let mut db = RegistryDb::open(&config.db_path())?;
    let rules = CityRules::bulgarian();

    let summary = run_repair_pass(&mut db, &rules)?;

    println!("City repair pass");
    println!("  rows scanned:      {}", summary.scanned);
    println!("  rows changed:      {}", summary.changed);
    println!("  malformed fields:  {}", summary.malformed_fields);
    Ok(())
}
