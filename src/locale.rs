// 🌍 Locale Classifier - Black-box language detection for descriptive text
// The pipeline only depends on the `LocaleClassifier` trait; the whatlang
// implementation is injected once per run by the driver.

use anyhow::{anyhow, Result};
use whatlang::{Detector, Lang};

/// The fixed candidate set the classifier is restricted to: ISO 639-3 tags
/// for the ten locales the catalog ships in.
pub const CANDIDATE_LOCALES: [&str; 10] = [
    "eng", "spa", "fra", "deu", "ita", "por", "nld", "swe", "dan", "fin",
];

/// Best-guess locale tag for a sample of descriptive text.
///
/// An error is fatal for the calling record's insert, never silently
/// swallowed by the pipeline.
pub trait LocaleClassifier {
    fn classify(&self, text: &str) -> Result<String>;
}

// ============================================================================
// WHATLANG CLASSIFIER
// ============================================================================

/// Production classifier backed by whatlang.
///
/// Built against a restricted candidate allowlist; when the candidate tags
/// cannot all be resolved, falls back to the unrestricted default detector
/// instead of aborting the run.
pub struct WhatlangClassifier {
    detector: Detector,
    restricted: bool,
}

impl WhatlangClassifier {
    /// Classifier restricted to [`CANDIDATE_LOCALES`].
    pub fn new() -> Self {
        Self::with_candidates(&CANDIDATE_LOCALES)
    }

    /// Classifier restricted to the given locale tags. Falls back to the
    /// unrestricted default model if any tag is unknown to whatlang.
    pub fn with_candidates(tags: &[&str]) -> Self {
        let langs: Vec<Lang> = tags.iter().filter_map(|tag| Lang::from_code(*tag)).collect();

        if !langs.is_empty() && langs.len() == tags.len() {
            WhatlangClassifier {
                detector: Detector::with_allowlist(langs),
                restricted: true,
            }
        } else {
            WhatlangClassifier {
                detector: Detector::new(),
                restricted: false,
            }
        }
    }

    /// Whether the restricted candidate set took effect.
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }
}

impl Default for WhatlangClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LocaleClassifier for WhatlangClassifier {
    fn classify(&self, text: &str) -> Result<String> {
        let info = self
            .detector
            .detect(text)
            .ok_or_else(|| anyhow!("locale detection returned no result for {:?}", text))?;

        Ok(info.lang().code().to_string())
    }
}

// ============================================================================
// CLASSIFICATION INPUT
// ============================================================================

/// Build the text sample classified for one record: product name, color and
/// category path concatenated, with category separators replaced by spaces
/// so they do not create spurious token boundaries.
pub fn classification_text(product_name: &str, color: &str, product_type: &str) -> String {
    let category = product_type.replace(['>', '/'], " ");
    format!("{} {} {}", product_name, color, category)
}

// ============================================================================
// TESTS
// ============================================================================
