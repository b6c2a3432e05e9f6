use anyhow::Result;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use catalog_ingestor::{dump_catalog, format_count, format_elapsed, SqliteSink};

fn main() -> Result<()> {
    let db_path = env_or_arg("CATALOG_DB_PATH", 1).unwrap_or_else(|| PathBuf::from("catalog.db"));
    let out_path = match env_or_arg("CATALOG_CSV_OUTPUT", 2) {
        Some(path) => path,
        None => {
            eprintln!("ERROR: no output CSV (pass a path or set CATALOG_CSV_OUTPUT)");
            std::process::exit(1);
        }
    };

    if !db_path.is_file() {
        eprintln!("ERROR: database not found: {}", db_path.display());
        std::process::exit(1);
    }

    println!("📤 Catalog dump: SQLite → CSV");
    println!("Database : {}", db_path.display());
    println!("Output   : {}", out_path.display());

    let sink = SqliteSink::open(&db_path)?;
    let writer = File::create(&out_path)?;

    let started = Instant::now();
    let written = dump_catalog(&sink, writer)?;

    println!("Total lines dumped: {}", format_count(written));
    println!(
        "Total elapsed time: {}",
        format_elapsed(started.elapsed().as_millis() as u64)
    );
    println!("✓ Data dumped to {}", out_path.display());

    Ok(())
}

fn env_or_arg(var: &str, arg_index: usize) -> Option<PathBuf> {
    if let Some(arg) = env::args().nth(arg_index) {
        return Some(PathBuf::from(arg));
    }
    env::var(var).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}
