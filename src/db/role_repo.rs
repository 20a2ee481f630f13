// src/db/role_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::Role;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    // Papel global semeado (Owner, Garçom...), buscado pelo nome.
    pub async fn find_global_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE restaurant_id IS NULL AND name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    // Modelos globais + papéis próprios do restaurante.
    pub async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE restaurant_id IS NULL OR restaurant_id = $1
            ORDER BY name
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
        grants_all: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (restaurant_id, name, description, permissions, grants_all)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(name)
        .bind(description)
        .bind(permissions)
        .bind(grants_all)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::RoleNameAlreadyExists;
                }
            }
            e.into()
        })?;

        Ok(role)
    }

    // Atualiza apenas papéis do próprio restaurante; modelos globais e
    // papéis de sistema nunca passam por aqui.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
        grants_all: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $1, description = $2, permissions = $3, grants_all = $4,
                updated_at = now()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(permissions)
        .bind(grants_all)
        .bind(role_id)
        .fetch_one(executor)
        .await?;

        Ok(role)
    }

    pub async fn delete<'e, E>(&self, executor: E, role_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn count_memberships_using(&self, role_id: Uuid) -> Result<i64, AppError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
