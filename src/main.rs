use anyhow::Result;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

use catalog_ingestor::{CommitMode, IngestionPipeline, SqliteSink, WhatlangClassifier};

fn main() -> Result<()> {
    let csv_path = input_path_or_exit();
    let db_path = env_or_arg("CATALOG_DB_PATH", 2).unwrap_or_else(|| PathBuf::from("catalog.db"));
    let mode = commit_mode_from_env();

    println!("📥 Catalog ingestion: CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Input    : {}", csv_path.display());
    println!("Database : {}", db_path.display());
    println!(
        "Commit   : {}",
        if mode == CommitMode::Auto { "auto" } else { "deferred" }
    );

    let input = File::open(&csv_path)?;
    let mut sink = SqliteSink::open(&db_path)?;

    let classifier = WhatlangClassifier::new();
    let mut pipeline = IngestionPipeline::new(classifier, mode).with_progress();

    let outcome = pipeline.run(input, &mut sink)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", outcome.stats.summary());

    println!("\n🔍 Brand consistency report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("{}", outcome.report.render());

    Ok(())
}

/// Input CSV from argv[1] or CATALOG_CSV_INPUT; checked before any
/// processing begins.
fn input_path_or_exit() -> PathBuf {
    let path = match env_or_arg("CATALOG_CSV_INPUT", 1) {
        Some(path) => path,
        None => {
            eprintln!("ERROR: no input CSV (pass a path or set CATALOG_CSV_INPUT)");
            std::process::exit(1);
        }
    };

    if !is_valid_file(&path) {
        eprintln!("ERROR: invalid file: {}", path.display());
        std::process::exit(1);
    }

    path
}

fn env_or_arg(var: &str, arg_index: usize) -> Option<PathBuf> {
    if let Some(arg) = env::args().nth(arg_index) {
        return Some(PathBuf::from(arg));
    }
    env::var(var).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn commit_mode_from_env() -> CommitMode {
    // Autocommit is useful for debugging; deferred single commit otherwise
    match env::var("CATALOG_AUTOCOMMIT") {
        Ok(value) if value.eq_ignore_ascii_case("true") || value == "1" => CommitMode::Auto,
        _ => CommitMode::Deferred,
    }
}

fn is_valid_file(path: &Path) -> bool {
    path.exists() && path.is_file()
}
