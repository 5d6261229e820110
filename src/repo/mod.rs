/// Repository layer for database operations
use crate::config::ParameterRow;
use crate::domain::{HistoryRecord, Satellite, SiteRecord, Status};
use crate::errors::{TrackerError, TrackerResult};
use crate::history::{plan_transition, Transition};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Site catalog, per-site parameters and tile assignments.
#[derive(Clone)]
pub struct SiteRepo {
    pool: PgPool,
}

impl SiteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All configured sites with a footprint, in catalog order.
    pub async fn list_sites(&self) -> TrackerResult<Vec<SiteRecord>> {
        let rows = sqlx::query_as::<_, (i16, String, String)>(
            "SELECT id, short_name, geog FROM site
             WHERE geog IS NOT NULL
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, short_name, polygon)| SiteRecord {
                id,
                short_name,
                polygon,
            })
            .collect())
    }

    /// One batched fetch of parameter rows for a site: both the site-scoped
    /// rows and the global defaults for every requested key.
    pub async fn fetch_parameters(
        &self,
        site_id: i16,
        keys: &[String],
    ) -> TrackerResult<Vec<ParameterRow>> {
        let rows = sqlx::query_as::<_, ParameterRow>(
            "SELECT key, site_id, value FROM config
             WHERE key = ANY($1) AND (site_id = $2 OR site_id IS NULL)",
        )
        .bind(keys)
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Tile identifiers assigned to a site for one satellite.
    pub async fn list_tiles(
        &self,
        site_id: i16,
        satellite: Satellite,
    ) -> TrackerResult<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT tile_id FROM site_tiles
             WHERE site_id = $1 AND satellite_id = $2
             ORDER BY tile_id",
        )
        .bind(site_id)
        .bind(satellite.id())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(tile,)| tile).collect())
    }
}

/// Download-history repository. The only component with mutation rights on
/// `downloader_history`.
#[derive(Clone)]
pub struct HistoryRepo {
    pool: PgPool,
}

impl HistoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Product names recorded for a site/satellite pair, excluding the given
    /// statuses. The provider excludes in-flight and retryable products so
    /// they stay eligible for reattempt.
    pub async fn list_product_names(
        &self,
        site_id: i16,
        satellite: Satellite,
        excluded: &[Status],
    ) -> TrackerResult<Vec<String>> {
        let excluded_ids: Vec<i16> = excluded.iter().map(Status::id).collect();
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT product_name FROM downloader_history
             WHERE site_id = $1 AND satellite_id = $2
               AND status_id != ALL($3)
             ORDER BY product_name",
        )
        .bind(site_id)
        .bind(satellite.id())
        .bind(excluded_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Looks up the history row for a product, if one exists.
    ///
    /// More than one row for the key is a data integrity violation and is
    /// reported as `DuplicateRecord` rather than silently picking one.
    pub async fn find_record(
        &self,
        site_id: i16,
        satellite: Satellite,
        product_name: &str,
    ) -> TrackerResult<Option<HistoryRecord>> {
        let rows = sqlx::query_as::<_, (i32, String, i16, i16, DateTime<Utc>)>(
            "SELECT id, full_path, status_id, no_of_retries, product_date
             FROM downloader_history
             WHERE site_id = $1 AND satellite_id = $2 AND product_name = $3",
        )
        .bind(site_id)
        .bind(satellite.id())
        .bind(product_name)
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            return Err(TrackerError::DuplicateRecord {
                product_name: product_name.to_string(),
                count: rows.len(),
            });
        }
        match rows.into_iter().next() {
            Some((id, full_path, status_id, retries, product_date)) => Ok(Some(HistoryRecord {
                id,
                site_id,
                satellite_id: satellite.id(),
                product_name: product_name.to_string(),
                full_path,
                status: Status::from_id(status_id)?,
                retries,
                product_date,
            })),
            None => Ok(None),
        }
    }

    /// Records a status event for a product, inserting the row on first
    /// observation and applying the retry rules otherwise.
    ///
    /// The select locks the row (`FOR UPDATE`) so concurrent failure reports
    /// on the same key serialize instead of losing retry increments. Exactly
    /// one row is inserted or mutated per call. More than one existing row
    /// for the key aborts with `DuplicateRecord` before any write.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_event(
        &self,
        site_id: i16,
        satellite: Satellite,
        product_name: &str,
        event: Status,
        product_date: DateTime<Utc>,
        full_path: &str,
        max_retries: i16,
    ) -> TrackerResult<Transition> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, (i32, i16, i16)>(
            "SELECT id, status_id, no_of_retries FROM downloader_history
             WHERE site_id = $1 AND satellite_id = $2 AND product_name = $3
             FOR UPDATE",
        )
        .bind(site_id)
        .bind(satellite.id())
        .bind(product_name)
        .fetch_all(&mut *tx)
        .await?;

        if rows.len() > 1 {
            return Err(TrackerError::DuplicateRecord {
                product_name: product_name.to_string(),
                count: rows.len(),
            });
        }

        let existing = match rows.first() {
            Some(&(_, status_id, retries)) => Some((Status::from_id(status_id)?, retries)),
            None => None,
        };
        let plan = plan_transition(existing, event, max_retries);

        match plan {
            Transition::Insert { status, retries } => {
                sqlx::query(
                    "INSERT INTO downloader_history
                       (site_id, satellite_id, product_name, full_path,
                        status_id, no_of_retries, product_date)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(site_id)
                .bind(satellite.id())
                .bind(product_name)
                .bind(full_path)
                .bind(status.id())
                .bind(retries)
                .bind(product_date)
                .execute(&mut *tx)
                .await?;
            }
            Transition::UpdateStatus { status } => {
                let id = rows[0].0;
                sqlx::query("UPDATE downloader_history SET status_id = $1 WHERE id = $2")
                    .bind(status.id())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            Transition::UpdateStatusAndRetries { status, retries } => {
                let id = rows[0].0;
                sqlx::query(
                    "UPDATE downloader_history
                     SET status_id = $1, no_of_retries = $2
                     WHERE id = $3",
                )
                .bind(status.id())
                .bind(retries)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(plan)
    }

    /// Marks a history row as processed and, when tiles were produced,
    /// registers the output in the product catalog. Both writes share one
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn mark_processed(
        &self,
        processor_id: i16,
        site_id: i16,
        history_id: i32,
        tiles: &[String],
        full_path: &str,
        product_name: &str,
        footprint: &str,
        satellite: Satellite,
        acquisition_date: DateTime<Utc>,
    ) -> TrackerResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE downloader_history SET status_id = $1 WHERE id = $2")
            .bind(Status::Processed.id())
            .bind(history_id)
            .execute(&mut *tx)
            .await?;

        if !tiles.is_empty() {
            sqlx::query(
                "INSERT INTO product
                   (product_type_id, processor_id, satellite_id, site_id, job_id,
                    full_path, created_timestamp, name, quicklook_image,
                    footprint, tiles)
                 VALUES ($1, $2, $3, $4, NULL, $5, $6, $7, $8, $9, $10)",
            )
            .bind(1i16)
            .bind(processor_id)
            .bind(satellite.id())
            .bind(site_id)
            .bind(full_path)
            .bind(acquisition_date)
            .bind(product_name)
            .bind("mosaic.jpg")
            .bind(footprint)
            .bind(serde_json::json!(tiles))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Initialize database tables
pub async fn init_db(pool: &PgPool) -> TrackerResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS site(
            id SMALLSERIAL PRIMARY KEY,
            short_name TEXT NOT NULL,
            geog TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS config(
            id BIGSERIAL PRIMARY KEY,
            key TEXT NOT NULL,
            site_id SMALLINT,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_config_key_site
         ON config(key, site_id) WHERE site_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_config_key_default
         ON config(key) WHERE site_id IS NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS downloader_history(
            id SERIAL PRIMARY KEY,
            site_id SMALLINT NOT NULL,
            satellite_id SMALLINT NOT NULL,
            product_name TEXT NOT NULL,
            full_path TEXT NOT NULL DEFAULT '',
            status_id SMALLINT NOT NULL,
            no_of_retries SMALLINT NOT NULL DEFAULT 1,
            product_date TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_history_site_satellite_product
         ON downloader_history(site_id, satellite_id, product_name)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS site_tiles(
            site_id SMALLINT NOT NULL,
            satellite_id SMALLINT NOT NULL,
            tile_id TEXT NOT NULL,
            PRIMARY KEY (site_id, satellite_id, tile_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS product(
            id BIGSERIAL PRIMARY KEY,
            product_type_id SMALLINT NOT NULL,
            processor_id SMALLINT NOT NULL,
            satellite_id SMALLINT NOT NULL,
            site_id SMALLINT NOT NULL,
            job_id SMALLINT,
            full_path TEXT NOT NULL,
            created_timestamp TIMESTAMPTZ,
            name TEXT NOT NULL,
            quicklook_image TEXT,
            footprint TEXT,
            tiles JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
