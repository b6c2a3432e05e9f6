// Catalog Ingestor - Core Library
// Exposes all modules for use in the CLI binaries and tests

pub mod analyzer;
pub mod entities;
pub mod export;
pub mod locale;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use analyzer::{
    brand_similarity, BrandConsistencyAnalyzer, BrandVariant, ConsistencyReport,
    ProductBrandReport,
};
pub use entities::{
    merge_gender, CatalogRecord, ExportRow, GenderFlags, ObservationKind, Warning, WarningKind,
};
pub use export::dump_catalog;
pub use locale::{classification_text, LocaleClassifier, WhatlangClassifier, CANDIDATE_LOCALES};
pub use normalize::{normalize_size_label, normalize_size_type, normalize_text};
pub use pipeline::{format_count, format_elapsed, IngestionPipeline, RunOutcome, RunStats};
pub use resolver::{EntityResolver, Resolution};
pub use store::{CommitMode, EntitySink, SqliteSink};
pub use validator::{check_header, validate_row, RowValidation, CSV_HEADER, FIELD_COUNT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
