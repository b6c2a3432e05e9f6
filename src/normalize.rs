// 🧹 Field Normalizer - Canonical form for free-text catalog fields
// Pure functions, no state. Deterministic and idempotent.

/// Lower-case the whole string, then upper-case only the first character.
///
/// Applied to brand, age-group, gender, color and product-name fields.
/// Empty input is returned unchanged. Idempotent:
/// `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        None => lower,
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Size labels are fully upper-cased ("xl" → "XL").
pub fn normalize_size_label(input: &str) -> String {
    input.to_uppercase()
}

/// Size types are fully lower-cased ("Regular" → "regular").
pub fn normalize_size_type(input: &str) -> String {
    input.to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================
