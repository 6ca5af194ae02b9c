use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::{check_id, check_name, timestamp_to_datetime, ResponseMapping, ResponseRepository};
use crate::error::{GatewayError, Result};

type ResponseRow = (String, String, String, i64);

pub struct SqliteResponseStore {
    pool: SqlitePool,
}

impl SqliteResponseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: ResponseRow) -> Result<ResponseMapping> {
        let (id, name, template, created_at) = row;
        Ok(ResponseMapping {
            id,
            name,
            template: serde_json::from_str(&template)?,
            created_at: timestamp_to_datetime(created_at),
        })
    }
}

#[async_trait]
impl ResponseRepository for SqliteResponseStore {
    async fn create(&self, response: &ResponseMapping) -> Result<()> {
        check_name(&response.name)?;
        let template = serde_json::to_string(&response.template)?;

        sqlx::query(
            r#"
            INSERT INTO responses (id, name, template, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&response.id)
        .bind(&response.name)
        .bind(&template)
        .bind(response.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::from_write(e, &format!("response '{}'", response.name)))?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseMapping>> {
        let id = check_id(id)?;

        let row = sqlx::query_as::<_, ResponseRow>(
            "SELECT id, name, template, created_at FROM responses WHERE id = ?1",
        )
        .bind(&id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ResponseMapping>> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            "SELECT id, name, template, created_at FROM responses ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = check_id(id)?;

        let result = sqlx::query("DELETE FROM responses WHERE id = ?1")
            .bind(&id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("response '{}'", id)));
        }
        Ok(())
    }
}
