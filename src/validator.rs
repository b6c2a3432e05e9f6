// 📋 Record Validator - Header and per-row structural checks
// A bad header aborts the run before any row is processed; a bad row is
// dropped with a warning and the run continues.

use anyhow::{bail, Result};
use csv::StringRecord;

/// Fixed input schema: 10 columns, exact names, exact order.
pub const CSV_HEADER: [&str; 10] = [
    "variant_id",
    "product_id",
    "size_label",
    "product_name",
    "brand",
    "color",
    "age_group",
    "gender",
    "size_type",
    "product_type",
];

pub const FIELD_COUNT: usize = CSV_HEADER.len();

/// Outcome of validating one data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowValidation {
    Valid,
    /// 1-based index of the leftmost empty (or missing) field.
    EmptyField(usize),
}

/// Verify the header row matches the fixed 10-column schema exactly.
/// A mismatch is a structural fatal condition.
pub fn check_header(header: &StringRecord) -> Result<()> {
    if header.len() != FIELD_COUNT {
        bail!(
            "invalid CSV header: expected {} columns, found {}",
            FIELD_COUNT,
            header.len()
        );
    }

    for (i, expected) in CSV_HEADER.iter().enumerate() {
        let found = header.get(i).unwrap_or("");
        if found != *expected {
            bail!(
                "invalid CSV header: column {} is '{}', expected '{}'",
                i + 1,
                found,
                expected
            );
        }
    }

    Ok(())
}

/// Scan a data row leftmost-first for an empty or missing field.
///
/// Does not fail: the caller records a warning and skips the row.
pub fn validate_row(record: &StringRecord) -> RowValidation {
    for i in 0..FIELD_COUNT {
        match record.get(i) {
            None => return RowValidation::EmptyField(i + 1),
            Some(value) if value.is_empty() => return RowValidation::EmptyField(i + 1),
            Some(_) => {}
        }
    }

    RowValidation::Valid
}

// ============================================================================
// TESTS
// ============================================================================
