// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::audit::{AuditEntry, AuditLog};

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Apenas-acréscimo: não existe UPDATE nem DELETE nesta tabela.
    pub async fn append<'e, E>(&self, executor: E, entry: AuditEntry) -> Result<AuditLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, target_model, target_id, changes, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.target_model)
        .bind(entry.target_id)
        .bind(entry.changes)
        .bind(entry.metadata)
        .fetch_one(executor)
        .await?;

        Ok(log)
    }

    pub async fn list(
        &self,
        target_model: Option<&str>,
        target_id: Option<Uuid>,
        restaurant_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<AuditLog>, AppError> {
        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::text IS NULL OR target_model = $1)
              AND ($2::uuid IS NULL OR target_id = $2)
              AND ($3::uuid IS NULL OR metadata->>'restaurantId' = $3::text)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(target_model)
        .bind(target_id)
        .bind(restaurant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
