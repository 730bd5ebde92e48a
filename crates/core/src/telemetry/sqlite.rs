//! SQLite-backed telemetry store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection};

use super::store::{TelemetryError, TelemetryStore};
use super::types::{SiteCode, TelemetryRow, TrackedTarget, UnsupportedSite};

/// SQLite-backed telemetry store.
pub struct SqliteTelemetryStore {
    conn: Mutex<Connection>,
}

impl SqliteTelemetryStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TelemetryError> {
        let conn = Connection::open(path).map_err(|e| TelemetryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, TelemetryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TelemetryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TelemetryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracked_products (
                site TEXT NOT NULL,
                asin TEXT NOT NULL,
                product_url TEXT NOT NULL,
                rank INTEGER NOT NULL,
                snapshot_date TEXT NOT NULL,
                PRIMARY KEY (site, asin, snapshot_date)
            );

            CREATE INDEX IF NOT EXISTS idx_tracked_products_site_date
                ON tracked_products(site, snapshot_date);

            CREATE TABLE IF NOT EXISTS telemetry_daily (
                site TEXT NOT NULL,
                asin TEXT NOT NULL,
                date TEXT NOT NULL,
                buybox_price REAL NOT NULL,
                price REAL NOT NULL,
                prime_price REAL,
                coupon_price REAL,
                coupon_discount REAL,
                child_sales INTEGER,
                fba_price REAL,
                fbm_price REAL,
                strikethrough_price REAL,
                rank INTEGER,
                category_rank_variant INTEGER,
                rating REAL,
                rating_count INTEGER,
                seller_count INTEGER,
                PRIMARY KEY (site, asin, date)
            );

            CREATE INDEX IF NOT EXISTS idx_telemetry_daily_asin_site
                ON telemetry_daily(asin, site, date);
            "#,
        )
        .map_err(|e| TelemetryError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_telemetry(row: &rusqlite::Row) -> rusqlite::Result<TelemetryRow> {
        fn bad(idx: usize, msg: String) -> rusqlite::Error {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
            )
        }

        let site_str: String = row.get(0)?;
        let date_str: String = row.get(2)?;
        Ok(TelemetryRow {
            site: site_str.parse().map_err(|e: UnsupportedSite| bad(0, e.to_string()))?,
            asin: row.get(1)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .map_err(|e| bad(2, e.to_string()))?,
            buybox_price: row.get(3)?,
            price: row.get(4)?,
            prime_price: row.get(5)?,
            coupon_price: row.get(6)?,
            coupon_discount: row.get(7)?,
            child_sales: row.get(8)?,
            fba_price: row.get(9)?,
            fbm_price: row.get(10)?,
            strikethrough_price: row.get(11)?,
            rank: row.get(12)?,
            category_rank_variant: row.get(13)?,
            rating: row.get(14)?,
            rating_count: row.get(15)?,
            seller_count: row.get(16)?,
        })
    }
}

impl TelemetryStore for SqliteTelemetryStore {
    fn latest_targets(
        &self,
        site: SiteCode,
        limit: usize,
    ) -> Result<Vec<TrackedTarget>, TelemetryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT asin, product_url, rank, snapshot_date
                FROM tracked_products
                WHERE site = ?1
                  AND snapshot_date = (
                      SELECT MAX(snapshot_date) FROM tracked_products WHERE site = ?1
                  )
                  AND TRIM(product_url) <> ''
                ORDER BY rank ASC, asin ASC
                LIMIT ?2
                "#,
            )
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        let targets = stmt
            .query_map(params![site.as_str(), limit as i64], |row| {
                let date_str: String = row.get(3)?;
                Ok(TrackedTarget {
                    asin: row.get(0)?,
                    product_url: row.get(1)?,
                    rank: row.get(2)?,
                    snapshot_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(
                        |e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        },
                    )?,
                })
            })
            .map_err(|e| TelemetryError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        Ok(targets)
    }

    fn insert_snapshot(
        &self,
        site: SiteCode,
        snapshot_date: NaiveDate,
        targets: &[(String, String, i64)],
    ) -> Result<(), TelemetryError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO tracked_products (site, asin, product_url, rank, snapshot_date)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(site, asin, snapshot_date) DO UPDATE SET
                        product_url = excluded.product_url,
                        rank = excluded.rank
                    "#,
                )
                .map_err(|e| TelemetryError::Database(e.to_string()))?;
            for (asin, url, rank) in targets {
                stmt.execute(params![
                    site.as_str(),
                    asin,
                    url,
                    rank,
                    snapshot_date.format("%Y-%m-%d").to_string()
                ])
                .map_err(|e| TelemetryError::Database(e.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;
        Ok(())
    }

    fn upsert_daily_rows(&self, rows: &[TelemetryRow]) -> Result<usize, TelemetryError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO telemetry_daily (
                        site, asin, date,
                        buybox_price, price, prime_price, coupon_price, coupon_discount,
                        child_sales, fba_price, fbm_price, strikethrough_price,
                        rank, category_rank_variant, rating, rating_count, seller_count
                    ) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17
                    )
                    ON CONFLICT(site, asin, date) DO UPDATE SET
                        buybox_price = excluded.buybox_price,
                        price = excluded.price,
                        prime_price = excluded.prime_price,
                        coupon_price = excluded.coupon_price,
                        coupon_discount = excluded.coupon_discount,
                        child_sales = excluded.child_sales,
                        fba_price = excluded.fba_price,
                        fbm_price = excluded.fbm_price,
                        strikethrough_price = excluded.strikethrough_price,
                        rank = excluded.rank,
                        category_rank_variant = excluded.category_rank_variant,
                        rating = excluded.rating,
                        rating_count = excluded.rating_count,
                        seller_count = excluded.seller_count
                    "#,
                )
                .map_err(|e| TelemetryError::Database(e.to_string()))?;

            for row in rows {
                stmt.execute(params![
                    row.site.as_str(),
                    row.asin,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.buybox_price,
                    row.price,
                    row.prime_price,
                    row.coupon_price,
                    row.coupon_discount,
                    row.child_sales,
                    row.fba_price,
                    row.fbm_price,
                    row.strikethrough_price,
                    row.rank,
                    row.category_rank_variant,
                    row.rating,
                    row.rating_count,
                    row.seller_count,
                ])
                .map_err(|e| TelemetryError::Database(e.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        Ok(rows.len())
    }

    fn fetch_daily_window(
        &self,
        asin: &str,
        site: SiteCode,
        range_days: u32,
    ) -> Result<Vec<TelemetryRow>, TelemetryError> {
        let conn = self.conn.lock().unwrap();

        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM telemetry_daily WHERE asin = ?1 AND site = ?2",
                params![asin, site.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        let Some(latest) = latest else {
            return Ok(Vec::new());
        };
        let latest_date = NaiveDate::parse_from_str(&latest, "%Y-%m-%d")
            .map_err(|e| TelemetryError::Database(e.to_string()))?;
        let cutoff = latest_date
            .checked_sub_days(Days::new(range_days.saturating_sub(1) as u64))
            .unwrap_or(latest_date);

        let mut stmt = conn
            .prepare(
                r#"
                SELECT site, asin, date,
                       buybox_price, price, prime_price, coupon_price, coupon_discount,
                       child_sales, fba_price, fbm_price, strikethrough_price,
                       rank, category_rank_variant, rating, rating_count, seller_count
                FROM telemetry_daily
                WHERE asin = ?1 AND site = ?2 AND date >= ?3
                ORDER BY date ASC
                "#,
            )
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![
                    asin,
                    site.as_str(),
                    cutoff.format("%Y-%m-%d").to_string()
                ],
                Self::row_to_telemetry,
            )
            .map_err(|e| TelemetryError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TelemetryError::Database(e.to_string()))?;

        Ok(rows)
    }

    fn daily_row_count(&self) -> Result<i64, TelemetryError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM telemetry_daily", [], |row| row.get(0))
            .map_err(|e| TelemetryError::Database(e.to_string()))
    }
}
