// 🔍 Brand Consistency Analyzer - Post-pass near-duplicate detection
// Runs once after ingestion over the committed BrandObservation rows.
// Diagnostic only: flags likely data-entry errors, never mutates stored data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strsim::jaro_winkler;

// ============================================================================
// SIMILARITY METRIC
// ============================================================================

/// Strip to lowercase ASCII letters and digits before comparison.
pub fn normalize_for_comparison(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Jaccard similarity over the character sets of two strings.
pub fn jaccard_chars(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Combined similarity between two raw brand strings.
///
/// Both strings are normalized to lowercase alphanumerics first. If either
/// normalized character set is a subset of the other's, the score is 1.0
/// (catches "nike" vs "nikeinc" where edit distance alone scores lower).
/// Otherwise the score is max(Jaro-Winkler, Jaccard) on the normalized
/// strings. Symmetric by construction.
pub fn brand_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_for_comparison(a);
    let nb = normalize_for_comparison(b);

    let set_a: HashSet<char> = na.chars().collect();
    let set_b: HashSet<char> = nb.chars().collect();

    if set_a.is_subset(&set_b) || set_b.is_subset(&set_a) {
        return 1.0;
    }

    jaro_winkler(&na, &nb).max(jaccard_chars(&na, &nb))
}

// ============================================================================
// REPORT TYPES
// ============================================================================

/// One distinct brand spelling for a product, with its observation count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandVariant {
    pub name: String,
    pub count: usize,
}

/// Consistency findings for one product with two or more distinct brand
/// spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBrandReport {
    pub product_id: i64,
    /// Most frequent spelling (ties broken lexicographically).
    pub canonical: String,
    /// All distinct spellings, most frequent first.
    pub variants: Vec<BrandVariant>,
    /// Spellings with zero similar partners in the set. Empty for sets of
    /// fewer than 3 members.
    pub outliers: Vec<String>,
}

/// Full post-pass report, one entry per inconsistent product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub products: Vec<ProductBrandReport>,
}

impl ConsistencyReport {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Human-readable rendering of the report.
    pub fn render(&self) -> String {
        if self.products.is_empty() {
            return "No brand inconsistencies found.\n".to_string();
        }

        let mut out = String::new();
        for product in &self.products {
            out.push_str(&format!(
                "product {}: {} distinct brand spellings\n",
                product.product_id,
                product.variants.len()
            ));
            out.push_str(&format!("  canonical candidate: {}\n", product.canonical));

            let observed: Vec<String> = product
                .variants
                .iter()
                .map(|v| format!("{} (x{})", v.name, v.count))
                .collect();
            out.push_str(&format!("  observed: {}\n", observed.join(", ")));

            if !product.outliers.is_empty() {
                out.push_str(&format!("  outliers: {}\n", product.outliers.join(", ")));
            }
        }

        out
    }
}

// ============================================================================
// ANALYZER
// ============================================================================

pub struct BrandConsistencyAnalyzer {
    /// A pair of spellings is "similar" at or above this combined score.
    pub similarity_threshold: f64,
}

impl BrandConsistencyAnalyzer {
    pub fn new() -> Self {
        BrandConsistencyAnalyzer {
            similarity_threshold: 0.8,
        }
    }

    /// Analyze (product id, raw brand text) observation pairs.
    ///
    /// Products with a single distinct spelling are skipped entirely.
    pub fn analyze(&self, observations: &[(i64, String)]) -> ConsistencyReport {
        // Distinct spelling → count, per product, in deterministic order
        let mut by_product: BTreeMap<i64, BTreeMap<String, usize>> = BTreeMap::new();
        for (product_id, name) in observations {
            *by_product
                .entry(*product_id)
                .or_default()
                .entry(name.clone())
                .or_insert(0) += 1;
        }

        let mut products = Vec::new();
        for (product_id, counts) in &by_product {
            if counts.len() < 2 {
                continue;
            }
            products.push(self.analyze_product(*product_id, counts));
        }

        ConsistencyReport { products }
    }

    fn analyze_product(
        &self,
        product_id: i64,
        counts: &BTreeMap<String, usize>,
    ) -> ProductBrandReport {
        // Frequency ranking; BTreeMap order makes ties lexicographic
        let mut variants: Vec<BrandVariant> = counts
            .iter()
            .map(|(name, count)| BrandVariant {
                name: name.clone(),
                count: *count,
            })
            .collect();
        variants.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let canonical = variants[0].name.clone();

        // Outlier scan: a spelling with zero similar partners is an outlier,
        // unless the set is too small to compare against (< 3 members), in
        // which case the scan stops as soon as that triggers once
        let names: Vec<&str> = counts.keys().map(|name| name.as_str()).collect();
        let mut outliers = Vec::new();
        for name in &names {
            let partners = names
                .iter()
                .filter(|other| {
                    **other != *name
                        && brand_similarity(name, other) >= self.similarity_threshold
                })
                .count();

            if partners == 0 {
                if names.len() < 3 {
                    break;
                }
                outliers.push(name.to_string());
            }
        }

        ProductBrandReport {
            product_id,
            canonical,
            variants,
            outliers,
        }
    }
}

impl Default for BrandConsistencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(pairs: &[(i64, &str)]) -> Vec<(i64, String)> {
        pairs.iter().map(|(id, s)| (*id, s.to_string())).collect()
    }

    #[test]
    fn test_similarity_symmetry() {
        for (a, b) in [
            ("Nike", "nike inc"),
            ("Acme", "Zylo"),
            ("Adidas", "Addidas"),
            ("", "Nike"),
        ] {
            assert_eq!(
                brand_similarity(a, b),
                brand_similarity(b, a),
                "similarity must be symmetric for ({:?}, {:?})",
                a,
                b
            );
        }
    }

    #[test]
    fn test_subset_short_circuit() {
        // Character-set subset scores 1.0 even where edit distance
        // alone would not
        assert_eq!(brand_similarity("nike", "nikeinc"), 1.0);
        assert_eq!(brand_similarity("Acme", "Acme Inc"), 1.0);
        // Punctuation and case are stripped before the comparison
        assert_eq!(brand_similarity("NIKE!", "nike, inc."), 1.0);
    }

    #[test]
    fn test_dissimilar_strings_score_low() {
        assert!(brand_similarity("Acme", "Zylo") < 0.8);
    }

    #[test]
    fn test_close_spellings_score_high() {
        assert!(brand_similarity("Adidas", "Addidas") >= 0.8);
    }

    #[test]
    fn test_jaccard_chars() {
        assert_eq!(jaccard_chars("abc", "abc"), 1.0);
        assert_eq!(jaccard_chars("abc", "xyz"), 0.0);
        // {a,b} ∩ {b,c} = {b}, union = {a,b,c}
        assert!((jaccard_chars("ab", "bc") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_for_comparison() {
        assert_eq!(normalize_for_comparison("Nike, Inc."), "nikeinc");
        assert_eq!(normalize_for_comparison("4-EVER 21"), "4ever21");
    }

    #[test]
    fn test_single_spelling_products_skipped() {
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[(1, "Nike"), (1, "Nike"), (2, "Acme")]));

        assert!(report.is_empty());
    }

    #[test]
    fn test_outlier_scenario() {
        // {"Acme", "Acme Inc", "Acme", "Zylo"}: canonical "Acme"; "Acme" and
        // "Acme Inc" are similar via subset; "Zylo" has no partners and the
        // set has 3 members, so it is flagged
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[
            (7, "Acme"),
            (7, "Acme Inc"),
            (7, "Acme"),
            (7, "Zylo"),
        ]));

        assert_eq!(report.products.len(), 1);
        let product = &report.products[0];
        assert_eq!(product.product_id, 7);
        assert_eq!(product.canonical, "Acme");
        assert_eq!(product.variants.len(), 3);
        assert_eq!(product.variants[0].count, 2);
        assert_eq!(product.outliers, vec!["Zylo".to_string()]);
    }

    #[test]
    fn test_two_member_sets_never_flag_outliers() {
        // Two dissimilar spellings, but nothing to compare against: suppressed
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[(1, "Acme"), (1, "Zylo")]));

        assert_eq!(report.products.len(), 1);
        assert!(report.products[0].outliers.is_empty());
    }

    #[test]
    fn test_canonical_tie_breaks_lexicographically() {
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[(1, "Nikee"), (1, "Nike")]));

        assert_eq!(report.products[0].canonical, "Nike");
    }

    #[test]
    fn test_render_report() {
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[
            (7, "Acme"),
            (7, "Acme Inc"),
            (7, "Acme"),
            (7, "Zylo"),
        ]));

        let text = report.render();
        assert!(text.contains("product 7"));
        assert!(text.contains("canonical candidate: Acme"));
        assert!(text.contains("Acme (x2)"));
        assert!(text.contains("outliers: Zylo"));
    }

    #[test]
    fn test_render_empty_report() {
        let report = ConsistencyReport::default();
        assert!(report.render().contains("No brand inconsistencies"));
    }

    #[test]
    fn test_report_json_round_trip() {
        let analyzer = BrandConsistencyAnalyzer::new();
        let report = analyzer.analyze(&observations(&[
            (7, "Acme"),
            (7, "Acme Inc"),
            (7, "Acme"),
            (7, "Zylo"),
        ]));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"canonical\":\"Acme\""));

        let parsed: ConsistencyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
