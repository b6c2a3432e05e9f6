// 📤 CSV Export - Re-flatten stored entities back to the 10-column schema
// Joins Product, Variant and the latest LocalizedAttributes per variant.

use anyhow::{Context, Result};
use std::io::Write;

use crate::store::SqliteSink;
use crate::validator::CSV_HEADER;

/// Dump the resolved catalog to `writer` as CSV. Returns the number of data
/// rows written.
pub fn dump_catalog<W: Write>(sink: &SqliteSink, writer: W) -> Result<usize> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(CSV_HEADER)
        .context("failed to write CSV header")?;

    let rows = sink.export_rows()?;
    let mut written = 0;

    for row in &rows {
        out.write_record(row.fields())
            .with_context(|| format!("failed to write variant '{}'", row.variant_code))?;
        written += 1;
    }

    out.flush()?;

    Ok(written)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::GenderFlags;
    use crate::store::EntitySink;

    #[test]
    fn test_dump_round_trips_schema() {
        let mut sink = SqliteSink::open_in_memory().unwrap();

        let brand_id = sink.insert_brand(1, "Nike").unwrap();
        let product_id = sink.insert_product(1, "P1", brand_id).unwrap();
        let flags = GenderFlags {
            male: true,
            female: false,
            unisex: false,
        };
        let variant_id = sink
            .insert_variant(1, product_id, "V1", "Adult", flags, "regular")
            .unwrap();
        sink.insert_localized_attributes(1, variant_id, "eng", "S", "Shirt", "Red", "Shirts")
            .unwrap();

        let mut buffer = Vec::new();
        let written = dump_catalog(&sink, &mut buffer).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "variant_id,product_id,size_label,product_name,brand,color,age_group,gender,size_type,product_type"
        );
        assert_eq!(
            lines.next().unwrap(),
            "V1,P1,S,Shirt,Nike,Red,Adult,Male,regular,Shirts"
        );
    }

    #[test]
    fn test_dump_empty_catalog() {
        let sink = SqliteSink::open_in_memory().unwrap();

        let mut buffer = Vec::new();
        let written = dump_catalog(&sink, &mut buffer).unwrap();

        assert_eq!(written, 0);
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
