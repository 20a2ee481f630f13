// src/db/settings_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT value FROM system_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }
}
