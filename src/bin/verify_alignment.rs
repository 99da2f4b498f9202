//! Read-only alignment report: registry vs caller Excel lists vs the
//! exported master JSON.

use coldcall_tools::config::Config;
use coldcall_tools::db::RegistryDb;
use coldcall_tools::reconcile::{run_alignment_check, SampledSet};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("alignment check failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let db = RegistryDb::open(&config.db_path())?;

    let report = run_alignment_check(&db, &config)?;

    println!("ALIGNMENT REPORT ({})", report.generated_at);
    println!("registry rows: {}", report.store_rows);

    for caller in &report.callers {
        println!();
        println!("[{}] listed in Excel: {}, assigned in DB: {}", caller.code, caller.listed, caller.assigned);
        print_set("missing in DB", &caller.missing);
        print_set("wrong caller in DB", &caller.wrong_caller);
        print_set("extra in DB (not in Excel)", &caller.extra);
    }

    println!();
    if report.export.snapshot_found {
        println!(
            "export snapshot: {} records compared, {} caller mismatches",
            report.export.compared, report.export.mismatched
        );
    } else {
        println!("export snapshot: not found, skipped");
    }
    Ok(())
}

fn print_set(label: &str, set: &SampledSet) {
    print!("  {label}: {}", set.count);
    if set.is_empty() {
        println!();
    } else {
        println!("  (e.g. {})", set.sample.join(", "));
    }
}
