// Metric catalog: the full set of series definitions, loaded once with no filter.

use crate::error::MigrationError;
use crate::models::SeriesDefinition;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

pub struct MetricCatalog {
    pool: SqlitePool,
}

impl MetricCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(repo = "catalog", operation = "load"))]
    pub async fn load(&self) -> Result<Vec<SeriesDefinition>, MigrationError> {
        let rows = sqlx::query(
            "SELECT id, org_id, name, interval, last_update FROM metric_idx ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(MigrationError::Catalog)?;

        rows.iter()
            .map(parse_definition)
            .collect::<Result<Vec<_>, _>>()
            .map_err(MigrationError::Catalog)
    }
}

fn parse_definition(row: &SqliteRow) -> Result<SeriesDefinition, sqlx::Error> {
    let interval: i64 = row.try_get("interval")?;
    Ok(SeriesDefinition {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        name: row.try_get("name")?,
        interval: u32::try_from(interval).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        last_update: row.try_get("last_update")?,
    })
}
