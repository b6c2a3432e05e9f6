// 🏷️ Entity Model - Resolved catalog entities
// Brand → Product → Variant → LocalizedAttributes, plus append-only
// observation rows that preserve every raw value as seen on its source line.

use serde::{Deserialize, Serialize};

// ============================================================================
// CATALOG RECORD
// ============================================================================

/// One accepted, normalized input row (the 10-column catalog schema).
///
/// Field values are already normalized (see `normalize`); the source line
/// number travels alongside, not inside, this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub variant_code: String,
    pub product_code: String,
    pub size_label: String,
    pub product_name: String,
    pub brand: String,
    pub color: String,
    pub age_group: String,
    pub gender: String,
    pub size_type: String,
    pub product_type: String,
}

// ============================================================================
// GENDER FLAGS
// ============================================================================

/// Gender flags on a Variant. Not mutually exclusive: repeated observations
/// of the same variant union into these flags, and a flag that is true never
/// goes back to false within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenderFlags {
    pub male: bool,
    pub female: bool,
    pub unisex: bool,
}

impl GenderFlags {
    /// Flattened label for export. Mixed or unisex observations collapse to
    /// "Unisex"; a variant with no recognized observation exports empty.
    pub fn label(&self) -> &'static str {
        match (self.male, self.female, self.unisex) {
            (true, false, false) => "Male",
            (false, true, false) => "Female",
            (false, false, false) => "",
            _ => "Unisex",
        }
    }
}

/// Union one observed gender value into existing flags.
///
/// The match is case-insensitive against {male, female, unisex}. Any other
/// value returns `None`: the flag schema only recognizes those three values,
/// so the caller records a skipped-update warning instead of failing.
/// Monotonic: the result never clears a flag that was already set.
pub fn merge_gender(existing: GenderFlags, observed: &str) -> Option<GenderFlags> {
    let mut merged = existing;
    match observed.to_lowercase().as_str() {
        "male" => merged.male = true,
        "female" => merged.female = true,
        "unisex" => merged.unisex = true,
        _ => return None,
    }
    Some(merged)
}

// ============================================================================
// OBSERVATION KINDS
// ============================================================================

/// Kind tag for a variant observation row (age-group or gender).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationKind {
    AgeGroup,
    Gender,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::AgeGroup => "age_group",
            ObservationKind::Gender => "gender",
        }
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Machine-readable warning kinds recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A required field was empty; the row was dropped.
    EmptyField,
    /// The gender value did not match {male, female, unisex}; the flag
    /// update was skipped.
    UnknownGender,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::EmptyField => "WARNING_EMPTY_FIELD",
            WarningKind::UnknownGender => "WARNING_UNKNOWN_GENDER",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted anomaly. Append-only; never blocks ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub csv_line: usize,
    pub kind: String,
    pub description: String,
}

// ============================================================================
// EXPORT ROW
// ============================================================================

/// One re-flattened output row: Product ⋈ Variant ⋈ latest
/// LocalizedAttributes per variant, back in the 10-column input schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub variant_code: String,
    pub product_code: String,
    pub size_label: String,
    pub product_name: String,
    pub brand: String,
    pub color: String,
    pub age_group: String,
    pub gender: String,
    pub size_type: String,
    pub product_type: String,
}

impl ExportRow {
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.variant_code,
            &self.product_code,
            &self.size_label,
            &self.product_name,
            &self.brand,
            &self.color,
            &self.age_group,
            &self.gender,
            &self.size_type,
            &self.product_type,
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_gender_sets_flag() {
        let flags = merge_gender(GenderFlags::default(), "Male").unwrap();
        assert!(flags.male);
        assert!(!flags.female);
        assert!(!flags.unisex);
    }

    #[test]
    fn test_merge_gender_case_insensitive() {
        let flags = merge_gender(GenderFlags::default(), "FEMALE").unwrap();
        assert!(flags.female);

        let flags = merge_gender(GenderFlags::default(), "unisex").unwrap();
        assert!(flags.unisex);
    }

    #[test]
    fn test_merge_gender_unions_across_observations() {
        let flags = merge_gender(GenderFlags::default(), "Male").unwrap();
        let flags = merge_gender(flags, "Female").unwrap();

        assert!(flags.male);
        assert!(flags.female);
        assert!(!flags.unisex);
    }

    #[test]
    fn test_merge_gender_monotonic() {
        // A flag that is already true stays true no matter what comes next
        let flags = merge_gender(GenderFlags::default(), "Male").unwrap();
        let flags = merge_gender(flags, "Unisex").unwrap();

        assert!(flags.male, "male flag must never reset");
        assert!(flags.unisex);
    }

    #[test]
    fn test_merge_gender_unknown_returns_none() {
        assert_eq!(merge_gender(GenderFlags::default(), "Kids"), None);
        assert_eq!(merge_gender(GenderFlags::default(), ""), None);

        // Existing flags are untouched by a skipped update
        let existing = GenderFlags {
            male: true,
            female: false,
            unisex: false,
        };
        assert_eq!(merge_gender(existing, "N/A"), None);
        assert!(existing.male);
    }

    #[test]
    fn test_gender_label() {
        let male = GenderFlags {
            male: true,
            female: false,
            unisex: false,
        };
        assert_eq!(male.label(), "Male");

        let both = GenderFlags {
            male: true,
            female: true,
            unisex: false,
        };
        assert_eq!(both.label(), "Unisex");

        assert_eq!(GenderFlags::default().label(), "");
    }

    #[test]
    fn test_warning_kind_tags() {
        assert_eq!(WarningKind::EmptyField.as_str(), "WARNING_EMPTY_FIELD");
        assert_eq!(WarningKind::UnknownGender.as_str(), "WARNING_UNKNOWN_GENDER");
        assert_eq!(format!("{}", WarningKind::EmptyField), "WARNING_EMPTY_FIELD");
    }
}
