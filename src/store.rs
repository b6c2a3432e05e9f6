// 🗄️ Persistence Sink - SQLite system of record for resolved entities
// Insert-returning-id, append-only observation rows, gender flag updates,
// and the projections the analyzer and exporter read back.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::entities::{ExportRow, GenderFlags, ObservationKind, Warning, WarningKind};

// ============================================================================
// COMMIT MODE
// ============================================================================

/// Transactional discipline for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Every write is durable immediately.
    Auto,
    /// The whole run commits atomically at the end, or rolls back as a
    /// whole on a fatal error.
    Deferred,
}

// ============================================================================
// ENTITY SINK TRAIT
// ============================================================================

/// Minimal contract the pipeline requires from the durable store.
pub trait EntitySink {
    fn insert_brand(&mut self, csv_line: usize, name: &str) -> Result<i64>;
    fn insert_product(&mut self, csv_line: usize, product_code: &str, brand_id: i64)
        -> Result<i64>;
    #[allow(clippy::too_many_arguments)]
    fn insert_variant(
        &mut self,
        csv_line: usize,
        product_id: i64,
        variant_code: &str,
        age_group: &str,
        flags: GenderFlags,
        size_type: &str,
    ) -> Result<i64>;
    fn update_gender_flags(&mut self, variant_id: i64, flags: GenderFlags) -> Result<()>;

    fn append_brand_observation(&mut self, csv_line: usize, product_id: i64, name: &str)
        -> Result<()>;
    fn append_variant_observation(
        &mut self,
        csv_line: usize,
        variant_id: i64,
        kind: ObservationKind,
        value: &str,
    ) -> Result<()>;
    #[allow(clippy::too_many_arguments)]
    fn insert_localized_attributes(
        &mut self,
        csv_line: usize,
        variant_id: i64,
        locale: &str,
        size_label: &str,
        product_name: &str,
        color: &str,
        product_type: &str,
    ) -> Result<()>;
    fn insert_warning(&mut self, csv_line: usize, kind: WarningKind, description: &str)
        -> Result<()>;

    /// (product id, raw brand text) for every BrandObservation row, in
    /// insertion order. Read-only; used by the post-pass analyzer.
    fn brand_observation_pairs(&self) -> Result<Vec<(i64, String)>>;
    fn warning_count(&self) -> Result<usize>;

    fn begin(&mut self, mode: CommitMode) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
}

// ============================================================================
// SQLITE SINK
// ============================================================================

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open (or create) the catalog database at `path` and set up its schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        let sink = SqliteSink { conn };
        sink.setup_schema()?;
        Ok(sink)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let sink = SqliteSink { conn };
        sink.setup_schema()?;
        Ok(sink)
    }

    fn setup_schema(&self) -> Result<()> {
        // WAL mode for crash recovery (no effect on in-memory databases)
        let _ = self.conn.pragma_update(None, "journal_mode", "WAL");

        // Business keys are deduplicated per run by the resolver's identity
        // caches, not by the schema: a later run against the same store
        // starts with empty caches and re-creates entities, so the key
        // columns are indexed but not UNIQUE.
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS brand (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS product (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                product_code TEXT NOT NULL,
                id_brand INTEGER NOT NULL REFERENCES brand(id)
            );

            CREATE TABLE IF NOT EXISTS brand_observation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                id_product INTEGER NOT NULL REFERENCES product(id),
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS variant (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                id_product INTEGER NOT NULL REFERENCES product(id),
                variant_code TEXT NOT NULL,
                age_group TEXT NOT NULL,
                male INTEGER NOT NULL DEFAULT 0,
                female INTEGER NOT NULL DEFAULT 0,
                unisex INTEGER NOT NULL DEFAULT 0,
                size_type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS variant_observation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                id_variant INTEGER NOT NULL REFERENCES variant(id),
                kind TEXT NOT NULL CHECK (kind IN ('age_group', 'gender')),
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS localized_attributes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                id_variant INTEGER NOT NULL REFERENCES variant(id),
                locale TEXT NOT NULL,
                size_label TEXT NOT NULL,
                product_name TEXT NOT NULL,
                color TEXT NOT NULL,
                product_type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS warning (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                csv_line INTEGER NOT NULL,
                kind TEXT NOT NULL,
                description TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_brand_name ON brand(name);
            CREATE INDEX IF NOT EXISTS idx_product_code ON product(product_code);
            CREATE INDEX IF NOT EXISTS idx_variant_code ON variant(variant_code);
            CREATE INDEX IF NOT EXISTS idx_brand_obs_product ON brand_observation(id_product);
            CREATE INDEX IF NOT EXISTS idx_variant_obs_variant ON variant_observation(id_variant);
            CREATE INDEX IF NOT EXISTS idx_localized_variant ON localized_attributes(id_variant);",
        )?;

        Ok(())
    }

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn brand_count(&self) -> Result<usize> {
        self.count("brand")
    }

    pub fn product_count(&self) -> Result<usize> {
        self.count("product")
    }

    pub fn variant_count(&self) -> Result<usize> {
        self.count("variant")
    }

    pub fn brand_observation_count(&self) -> Result<usize> {
        self.count("brand_observation")
    }

    pub fn variant_observation_count(&self) -> Result<usize> {
        self.count("variant_observation")
    }

    pub fn localized_attributes_count(&self) -> Result<usize> {
        self.count("localized_attributes")
    }

    /// Current gender flags stored for a variant.
    pub fn gender_flags(&self, variant_id: i64) -> Result<GenderFlags> {
        let flags = self.conn.query_row(
            "SELECT male, female, unisex FROM variant WHERE id = ?1",
            params![variant_id],
            |row| {
                Ok(GenderFlags {
                    male: row.get::<_, i64>(0)? != 0,
                    female: row.get::<_, i64>(1)? != 0,
                    unisex: row.get::<_, i64>(2)? != 0,
                })
            },
        )?;

        Ok(flags)
    }

    /// All persisted warnings, in insertion order.
    pub fn warnings(&self) -> Result<Vec<Warning>> {
        let mut stmt = self
            .conn
            .prepare("SELECT csv_line, kind, description FROM warning ORDER BY id")?;

        let warnings = stmt
            .query_map([], |row| {
                Ok(Warning {
                    csv_line: row.get::<_, i64>(0)? as usize,
                    kind: row.get(1)?,
                    description: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(warnings)
    }

    /// Re-flattened catalog rows: Product ⋈ Variant ⋈ latest
    /// LocalizedAttributes per variant, used by the CSV dump.
    pub fn export_rows(&self) -> Result<Vec<ExportRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.variant_code, p.product_code, la.size_label, la.product_name,
                    b.name, la.color, v.age_group, v.male, v.female, v.unisex,
                    v.size_type, la.product_type
             FROM variant v
             JOIN product p ON v.id_product = p.id
             JOIN brand b ON p.id_brand = b.id
             JOIN localized_attributes la ON la.id_variant = v.id
             WHERE la.csv_line = (
                 SELECT MAX(la2.csv_line)
                 FROM localized_attributes la2
                 WHERE la2.id_variant = v.id
             )
             ORDER BY v.id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let flags = GenderFlags {
                    male: row.get::<_, i64>(7)? != 0,
                    female: row.get::<_, i64>(8)? != 0,
                    unisex: row.get::<_, i64>(9)? != 0,
                };

                Ok(ExportRow {
                    variant_code: row.get(0)?,
                    product_code: row.get(1)?,
                    size_label: row.get(2)?,
                    product_name: row.get(3)?,
                    brand: row.get(4)?,
                    color: row.get(5)?,
                    age_group: row.get(6)?,
                    gender: flags.label().to_string(),
                    size_type: row.get(10)?,
                    product_type: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl EntitySink for SqliteSink {
    fn insert_brand(&mut self, csv_line: usize, name: &str) -> Result<i64> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO brand (csv_line, name) VALUES (?1, ?2) RETURNING id",
                params![csv_line as i64, name],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to insert brand '{}' (line {})", name, csv_line))?;

        Ok(id)
    }

    fn insert_product(
        &mut self,
        csv_line: usize,
        product_code: &str,
        brand_id: i64,
    ) -> Result<i64> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO product (csv_line, product_code, id_brand)
                 VALUES (?1, ?2, ?3) RETURNING id",
                params![csv_line as i64, product_code, brand_id],
                |row| row.get(0),
            )
            .with_context(|| {
                format!("failed to insert product '{}' (line {})", product_code, csv_line)
            })?;

        Ok(id)
    }

    fn insert_variant(
        &mut self,
        csv_line: usize,
        product_id: i64,
        variant_code: &str,
        age_group: &str,
        flags: GenderFlags,
        size_type: &str,
    ) -> Result<i64> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO variant (csv_line, id_product, variant_code, age_group,
                                      male, female, unisex, size_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id",
                params![
                    csv_line as i64,
                    product_id,
                    variant_code,
                    age_group,
                    flags.male,
                    flags.female,
                    flags.unisex,
                    size_type,
                ],
                |row| row.get(0),
            )
            .with_context(|| {
                format!("failed to insert variant '{}' (line {})", variant_code, csv_line)
            })?;

        Ok(id)
    }

    fn update_gender_flags(&mut self, variant_id: i64, flags: GenderFlags) -> Result<()> {
        self.conn.execute(
            "UPDATE variant SET male = ?1, female = ?2, unisex = ?3 WHERE id = ?4",
            params![flags.male, flags.female, flags.unisex, variant_id],
        )?;

        Ok(())
    }

    fn append_brand_observation(
        &mut self,
        csv_line: usize,
        product_id: i64,
        name: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO brand_observation (csv_line, id_product, name) VALUES (?1, ?2, ?3)",
            params![csv_line as i64, product_id, name],
        )?;

        Ok(())
    }

    fn append_variant_observation(
        &mut self,
        csv_line: usize,
        variant_id: i64,
        kind: ObservationKind,
        value: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO variant_observation (csv_line, id_variant, kind, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![csv_line as i64, variant_id, kind.as_str(), value],
        )?;

        Ok(())
    }

    fn insert_localized_attributes(
        &mut self,
        csv_line: usize,
        variant_id: i64,
        locale: &str,
        size_label: &str,
        product_name: &str,
        color: &str,
        product_type: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO localized_attributes
                     (csv_line, id_variant, locale, size_label, product_name, color, product_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    csv_line as i64,
                    variant_id,
                    locale,
                    size_label,
                    product_name,
                    color,
                    product_type,
                ],
            )
            .with_context(|| {
                format!("failed to insert localized attributes (line {})", csv_line)
            })?;

        Ok(())
    }

    fn insert_warning(
        &mut self,
        csv_line: usize,
        kind: WarningKind,
        description: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO warning (csv_line, kind, description) VALUES (?1, ?2, ?3)",
            params![csv_line as i64, kind.as_str(), description],
        )?;

        Ok(())
    }

    fn brand_observation_pairs(&self) -> Result<Vec<(i64, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id_product, name FROM brand_observation ORDER BY id")?;

        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    fn warning_count(&self) -> Result<usize> {
        self.count("warning")
    }

    fn begin(&mut self, mode: CommitMode) -> Result<()> {
        if mode == CommitMode::Deferred {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
