use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::{check_id, check_name, timestamp_to_datetime, Source, SourceRepository};
use crate::error::{GatewayError, Result};

type SourceRow = (String, String, bool, Option<String>, String, i64);

pub struct SqliteSourceStore {
    pool: SqlitePool,
}

impl SqliteSourceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: SourceRow) -> Result<Source> {
        let (id, name, serial, response_id, mapping, created_at) = row;
        Ok(Source {
            id,
            name,
            serial,
            response_id,
            mapping: serde_json::from_str(&mapping)?,
            created_at: timestamp_to_datetime(created_at),
        })
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceStore {
    async fn create(&self, source: &Source) -> Result<()> {
        check_name(&source.name)?;
        let mapping = serde_json::to_string(&source.mapping)?;

        sqlx::query(
            r#"
            INSERT INTO sources (id, name, serial, response_id, mapping, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(source.serial)
        .bind(&source.response_id)
        .bind(&mapping)
        .bind(source.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::from_write(e, &format!("source '{}'", source.name)))?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Source> {
        let id = check_id(id)?;

        let row = sqlx::query_as::<_, SourceRow>(
            "SELECT id, name, serial, response_id, mapping, created_at FROM sources WHERE id = ?1",
        )
        .bind(&id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::from_row(row),
            None => Err(GatewayError::NotFound(format!("source '{}'", id))),
        }
    }

    async fn list(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT id, name, serial, response_id, mapping, created_at FROM sources ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = check_id(id)?;

        let result = sqlx::query("DELETE FROM sources WHERE id = ?1")
            .bind(&id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("source '{}'", id)));
        }
        Ok(())
    }
}
