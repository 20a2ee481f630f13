// src/db/membership_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::{MemberView, Membership};

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // O índice único (user_id, restaurant_id) garante no máximo um papel
    // por usuário em cada restaurante.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        restaurant_id: Uuid,
        role_id: Uuid,
        is_default: bool,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, restaurant_id, role_id, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(role_id)
        .bind(is_default)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::MembershipAlreadyExists;
                }
            }
            e.into()
        })?;

        Ok(membership)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>, AppError> {
        let membership =
            sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(membership)
    }

    // A consulta do portão de autorização. Única por construção.
    pub async fn find_for_user_and_restaurant(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 AND restaurant_id = $2",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    pub async fn list_members(&self, restaurant_id: Uuid) -> Result<Vec<MemberView>, AppError> {
        let members = sqlx::query_as::<_, MemberView>(
            r#"
            SELECT m.id, m.user_id, u.name AS user_name, u.email AS user_email,
                   m.role_id, r.name AS role_name, m.active, m.is_default
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            JOIN roles r ON r.id = m.role_id
            WHERE m.restaurant_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        role_id: Uuid,
        active: bool,
        is_default: bool,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET role_id = $1, active = $2, is_default = $3, updated_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(active)
        .bind(is_default)
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    // Usado antes de marcar um novo contexto padrão.
    pub async fn clear_default<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE memberships SET is_default = false, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    // Remoção completa do usuário do restaurante; revogação simples usa
    // `update` com active = false.
    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn find_default_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE user_id = $1 AND active = true
            ORDER BY is_default DESC, created_at
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    // Equipe da plataforma: algum vínculo ativo com papel de sistema.
    pub async fn user_has_system_role(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM memberships m
                JOIN roles r ON r.id = m.role_id
                WHERE m.user_id = $1
                  AND m.active = true
                  AND r.is_system = true
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0)
    }
}
