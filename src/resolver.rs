// 🔗 Entity Resolver - Raw business keys → persisted surrogate ids
// One resolver instance per run; the three identity caches live here and
// are discarded when the run ends. No fuzzy matching at ingest time: brand
// identity is exact normalized name, the analyzer diagnoses near-duplicates
// after the fact.

use anyhow::Result;
use std::collections::HashMap;

use crate::entities::{merge_gender, CatalogRecord, GenderFlags, ObservationKind, WarningKind};
use crate::locale::{classification_text, LocaleClassifier};
use crate::store::EntitySink;

/// Surrogate ids resolved for one accepted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub product_id: i64,
    pub variant_id: i64,
    pub locale: String,
}

#[derive(Debug, Clone, Copy)]
struct CachedVariant {
    id: i64,
    flags: GenderFlags,
}

// ============================================================================
// ENTITY RESOLVER
// ============================================================================

pub struct EntityResolver<C: LocaleClassifier> {
    classifier: C,
    brand_ids: HashMap<String, i64>,
    product_ids: HashMap<String, i64>,
    variants: HashMap<String, CachedVariant>,
}

impl<C: LocaleClassifier> EntityResolver<C> {
    /// Resolver with empty identity caches; the classifier is injected for
    /// the lifetime of the run.
    pub fn new(classifier: C) -> Self {
        EntityResolver {
            classifier,
            brand_ids: HashMap::new(),
            product_ids: HashMap::new(),
            variants: HashMap::new(),
        }
    }

    /// Resolve one accepted, normalized record into the entity graph.
    ///
    /// Any persistence or classification failure here is structural: the
    /// rest of the record depends on these writes, so the error propagates
    /// to the driver instead of being absorbed at the row boundary.
    pub fn resolve_record(
        &mut self,
        sink: &mut dyn EntitySink,
        csv_line: usize,
        record: &CatalogRecord,
    ) -> Result<Resolution> {
        let product_id = self.resolve_product(sink, csv_line, record)?;
        let variant_id = self.resolve_variant(sink, csv_line, product_id, record)?;

        let sample =
            classification_text(&record.product_name, &record.color, &record.product_type);
        let locale = self.classifier.classify(&sample)?;

        sink.insert_localized_attributes(
            csv_line,
            variant_id,
            &locale,
            &record.size_label,
            &record.product_name,
            &record.color,
            &record.product_type,
        )?;

        Ok(Resolution {
            product_id,
            variant_id,
            locale,
        })
    }

    /// Brand/product resolution. The BrandObservation row is appended for
    /// every record, cached or not: the same product may arrive with
    /// different brand spellings across lines.
    fn resolve_product(
        &mut self,
        sink: &mut dyn EntitySink,
        csv_line: usize,
        record: &CatalogRecord,
    ) -> Result<i64> {
        let product_id = match self.product_ids.get(&record.product_code) {
            Some(&id) => id,
            None => {
                let brand_id = match self.brand_ids.get(&record.brand) {
                    Some(&id) => id,
                    None => {
                        let id = sink.insert_brand(csv_line, &record.brand)?;
                        self.brand_ids.insert(record.brand.clone(), id);
                        id
                    }
                };

                let id = sink.insert_product(csv_line, &record.product_code, brand_id)?;
                self.product_ids.insert(record.product_code.clone(), id);
                id
            }
        };

        sink.append_brand_observation(csv_line, product_id, &record.brand)?;

        Ok(product_id)
    }

    /// Variant resolution. Gender flags are unioned across repeated
    /// observations; an unrecognized gender value skips the flag update and
    /// records a warning instead of failing the record.
    fn resolve_variant(
        &mut self,
        sink: &mut dyn EntitySink,
        csv_line: usize,
        product_id: i64,
        record: &CatalogRecord,
    ) -> Result<i64> {
        let variant_id = match self.variants.get_mut(&record.variant_code) {
            Some(cached) => {
                match merge_gender(cached.flags, &record.gender) {
                    Some(merged) => {
                        if merged != cached.flags {
                            sink.update_gender_flags(cached.id, merged)?;
                            cached.flags = merged;
                        }
                    }
                    None => {
                        sink.insert_warning(
                            csv_line,
                            WarningKind::UnknownGender,
                            &format!(
                                "unrecognized gender '{}' on variant '{}', flag update skipped",
                                record.gender, record.variant_code
                            ),
                        )?;
                    }
                }
                cached.id
            }
            None => {
                let flags =
                    merge_gender(GenderFlags::default(), &record.gender).unwrap_or_default();
                let id = sink.insert_variant(
                    csv_line,
                    product_id,
                    &record.variant_code,
                    &record.age_group,
                    flags,
                    &record.size_type,
                )?;
                self.variants
                    .insert(record.variant_code.clone(), CachedVariant { id, flags });
                id
            }
        };

        sink.append_variant_observation(
            csv_line,
            variant_id,
            ObservationKind::AgeGroup,
            &record.age_group,
        )?;
        sink.append_variant_observation(
            csv_line,
            variant_id,
            ObservationKind::Gender,
            &record.gender,
        )?;

        Ok(variant_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteSink;
    use anyhow::anyhow;

    /// Deterministic classifier for tests.
    struct FixedLocale(&'static str);

    impl LocaleClassifier for FixedLocale {
        fn classify(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Classifier that always fails, for fatal-propagation tests.
    struct BrokenClassifier;

    impl LocaleClassifier for BrokenClassifier {
        fn classify(&self, _text: &str) -> Result<String> {
            Err(anyhow!("classifier unavailable"))
        }
    }

    fn create_test_record(
        variant_code: &str,
        product_code: &str,
        brand: &str,
        gender: &str,
    ) -> CatalogRecord {
        CatalogRecord {
            variant_code: variant_code.to_string(),
            product_code: product_code.to_string(),
            size_label: "S".to_string(),
            product_name: "Shirt".to_string(),
            brand: brand.to_string(),
            color: "Red".to_string(),
            age_group: "Adult".to_string(),
            gender: gender.to_string(),
            size_type: "regular".to_string(),
            product_type: "Shirts".to_string(),
        }
    }

    #[test]
    fn test_identity_stability() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        let record = create_test_record("V1", "P1", "Nike", "Male");
        let first = resolver.resolve_record(&mut sink, 1, &record).unwrap();
        let second = resolver.resolve_record(&mut sink, 2, &record).unwrap();

        assert_eq!(first.product_id, second.product_id);
        assert_eq!(first.variant_id, second.variant_id);
        assert_eq!(sink.product_count().unwrap(), 1);
        assert_eq!(sink.variant_count().unwrap(), 1);
    }

    #[test]
    fn test_gender_union_scenario() {
        // V1,P1,...,Male then V1,P1,...,Female → one variant with both flags,
        // two brand observations, two localized rows
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        let male = create_test_record("V1", "P1", "Nike", "Male");
        let female = create_test_record("V1", "P1", "Nike", "Female");

        let first = resolver.resolve_record(&mut sink, 1, &male).unwrap();
        resolver.resolve_record(&mut sink, 2, &female).unwrap();

        let flags = sink.gender_flags(first.variant_id).unwrap();
        assert!(flags.male);
        assert!(flags.female);
        assert!(!flags.unisex);

        assert_eq!(sink.product_count().unwrap(), 1);
        assert_eq!(sink.variant_count().unwrap(), 1);
        assert_eq!(sink.brand_observation_count().unwrap(), 2);
        assert_eq!(sink.localized_attributes_count().unwrap(), 2);
        // One age-group plus one gender observation per record
        assert_eq!(sink.variant_observation_count().unwrap(), 4);
    }

    #[test]
    fn test_brand_spelling_variants_share_product() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        // Second spelling arrives after the product is cached, so no new
        // brand or product row is created
        let a = create_test_record("V1", "P1", "Nike", "Male");
        let b = create_test_record("V2", "P1", "Nikee", "Male");

        resolver.resolve_record(&mut sink, 1, &a).unwrap();
        resolver.resolve_record(&mut sink, 2, &b).unwrap();

        assert_eq!(sink.brand_count().unwrap(), 1);
        assert_eq!(sink.product_count().unwrap(), 1);
        assert_eq!(sink.variant_count().unwrap(), 2);

        let pairs = sink.brand_observation_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, pairs[1].0);
        assert_eq!(pairs[1].1, "Nikee");
    }

    #[test]
    fn test_same_brand_different_products() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        let a = create_test_record("V1", "P1", "Nike", "Male");
        let b = create_test_record("V2", "P2", "Nike", "Male");

        resolver.resolve_record(&mut sink, 1, &a).unwrap();
        resolver.resolve_record(&mut sink, 2, &b).unwrap();

        assert_eq!(sink.brand_count().unwrap(), 1);
        assert_eq!(sink.product_count().unwrap(), 2);
    }

    #[test]
    fn test_unknown_gender_on_existing_variant_warns() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        let male = create_test_record("V1", "P1", "Nike", "Male");
        let odd = create_test_record("V1", "P1", "Nike", "Kids");

        let first = resolver.resolve_record(&mut sink, 1, &male).unwrap();
        resolver.resolve_record(&mut sink, 2, &odd).unwrap();

        // Flags unchanged, warning persisted, observation rows still appended
        let flags = sink.gender_flags(first.variant_id).unwrap();
        assert!(flags.male);
        assert!(!flags.female);
        assert!(!flags.unisex);

        let warnings = sink.warnings().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, "WARNING_UNKNOWN_GENDER");
        assert_eq!(warnings[0].csv_line, 2);
        assert_eq!(sink.variant_observation_count().unwrap(), 4);
    }

    #[test]
    fn test_unknown_gender_on_new_variant_starts_unset() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("eng"));

        let odd = create_test_record("V1", "P1", "Nike", "Kids");
        let resolution = resolver.resolve_record(&mut sink, 1, &odd).unwrap();

        assert_eq!(sink.gender_flags(resolution.variant_id).unwrap(), GenderFlags::default());
    }

    #[test]
    fn test_localized_row_carries_locale_tag() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(FixedLocale("spa"));

        let record = create_test_record("V1", "P1", "Nike", "Male");
        let resolution = resolver.resolve_record(&mut sink, 1, &record).unwrap();

        assert_eq!(resolution.locale, "spa");
        assert_eq!(sink.localized_attributes_count().unwrap(), 1);
    }

    #[test]
    fn test_classifier_failure_is_fatal_for_record() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        let mut resolver = EntityResolver::new(BrokenClassifier);

        let record = create_test_record("V1", "P1", "Nike", "Male");
        assert!(resolver.resolve_record(&mut sink, 1, &record).is_err());
    }
}
