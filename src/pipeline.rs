// 🚰 Pipeline Driver - One pass: validate → normalize → resolve → persist
// Thin orchestration. Row-level anomalies are absorbed at the row boundary;
// structural failures abort the run (rolling back in deferred-commit mode).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::Instant;

use crate::analyzer::{BrandConsistencyAnalyzer, ConsistencyReport};
use crate::entities::{CatalogRecord, WarningKind};
use crate::locale::LocaleClassifier;
use crate::normalize::{normalize_size_label, normalize_size_type, normalize_text};
use crate::resolver::EntityResolver;
use crate::store::{CommitMode, EntitySink};
use crate::validator::{check_header, validate_row, RowValidation, CSV_HEADER};

const PROGRESS_INTERVAL: usize = 1000;

// ============================================================================
// RUN STATS
// ============================================================================

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub rows_read: usize,
    pub rows_ingested: usize,
    pub rows_dropped: usize,
    pub warnings: usize,
    pub ingest_millis: u64,
    pub analysis_millis: u64,
}

impl RunStats {
    fn new() -> Self {
        RunStats {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now(),
            rows_read: 0,
            rows_ingested: 0,
            rows_dropped: 0,
            warnings: 0,
            ingest_millis: 0,
            analysis_millis: 0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "run {} (started {})\n\
             Rows read     : {}\n\
             Rows ingested : {}\n\
             Rows dropped  : {}\n\
             Warnings      : {}\n\
             Ingest time   : {}\n\
             Analysis time : {}",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_count(self.rows_read),
            format_count(self.rows_ingested),
            format_count(self.rows_dropped),
            format_count(self.warnings),
            format_elapsed(self.ingest_millis),
            format_elapsed(self.analysis_millis),
        )
    }
}

/// Result of a full pipeline run: stats plus the post-pass report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub report: ConsistencyReport,
}

/// `XhMMmSS.mmms` elapsed-time formatting.
pub fn format_elapsed(millis: u64) -> String {
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1000) % 60;
    let remainder = millis % 1000;

    format!("{}h {:02}m {:02}.{:03}s", hours, minutes, seconds, remainder)
}

/// Thousands-separated counter for progress output.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct IngestionPipeline<C: LocaleClassifier> {
    resolver: EntityResolver<C>,
    analyzer: BrandConsistencyAnalyzer,
    mode: CommitMode,
    /// Progress lines on stdout; disabled in tests.
    progress: bool,
}

impl<C: LocaleClassifier> IngestionPipeline<C> {
    pub fn new(classifier: C, mode: CommitMode) -> Self {
        IngestionPipeline {
            resolver: EntityResolver::new(classifier),
            analyzer: BrandConsistencyAnalyzer::new(),
            mode,
            progress: false,
        }
    }

    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }

    /// Run the full pipeline: ingest every record from `input`, commit, then
    /// run the brand consistency analyzer over the accumulated observations.
    ///
    /// On a structural failure the deferred transaction is rolled back and
    /// the statistics gathered so far are reported before the error
    /// propagates.
    pub fn run<R: Read>(&mut self, input: R, sink: &mut dyn EntitySink) -> Result<RunOutcome> {
        let mut stats = RunStats::new();
        let started = Instant::now();

        sink.begin(self.mode)?;

        if let Err(e) = self.ingest(input, sink, &mut stats) {
            let _ = sink.rollback();
            eprintln!(
                "ERROR: run aborted after {} rows ({} ingested, {} dropped)",
                stats.rows_read, stats.rows_ingested, stats.rows_dropped
            );
            return Err(e);
        }

        sink.commit()?;
        stats.ingest_millis = started.elapsed().as_millis() as u64;

        // Post-pass: read-only, over the fully committed entity set
        let post = Instant::now();
        let pairs = sink.brand_observation_pairs()?;
        let report = self.analyzer.analyze(&pairs);
        stats.analysis_millis = post.elapsed().as_millis() as u64;

        stats.warnings = sink.warning_count()?;

        Ok(RunOutcome { stats, report })
    }

    fn ingest<R: Read>(
        &mut self,
        input: R,
        sink: &mut dyn EntitySink,
        stats: &mut RunStats,
    ) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

        let header = reader.headers().context("failed to read CSV header")?;
        check_header(header)?;

        for (index, row) in reader.records().enumerate() {
            let csv_line = index + 1;
            let row = row.with_context(|| format!("failed to parse CSV line {}", csv_line))?;
            stats.rows_read += 1;

            match validate_row(&row) {
                RowValidation::EmptyField(field_index) => {
                    sink.insert_warning(
                        csv_line,
                        WarningKind::EmptyField,
                        &format!(
                            "empty value in field {} ({})",
                            field_index,
                            CSV_HEADER[field_index - 1]
                        ),
                    )?;
                    stats.rows_dropped += 1;
                    continue;
                }
                RowValidation::Valid => {}
            }

            let record = normalize_record(&row);
            self.resolver.resolve_record(sink, csv_line, &record)?;
            stats.rows_ingested += 1;

            if self.progress && stats.rows_read % PROGRESS_INTERVAL == 0 {
                print!("\rIngested lines: {}", format_count(stats.rows_read));
                let _ = std::io::stdout().flush();
            }
        }

        if self.progress && stats.rows_read >= PROGRESS_INTERVAL {
            println!();
        }

        Ok(())
    }
}

/// Build a normalized record from a validated raw row.
fn normalize_record(row: &csv::StringRecord) -> CatalogRecord {
    let field = |i: usize| row.get(i).unwrap_or("");

    CatalogRecord {
        variant_code: field(0).to_string(),
        product_code: field(1).to_string(),
        size_label: normalize_size_label(field(2)),
        product_name: normalize_text(field(3)),
        brand: normalize_text(field(4)),
        color: normalize_text(field(5)),
        age_group: normalize_text(field(6)),
        gender: normalize_text(field(7)),
        size_type: normalize_size_type(field(8)),
        product_type: field(9).to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
