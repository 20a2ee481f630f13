// src/db/restaurant_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::restaurant::Restaurant;

#[derive(Clone)]
pub struct RestaurantRepository {
    pool: PgPool,
}

impl RestaurantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        address: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Restaurant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let restaurant = sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants (name, address, phone, email, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(address)
        .bind(phone)
        .bind(email)
        .bind(owner_id)
        .fetch_one(executor)
        .await?;

        Ok(restaurant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, AppError> {
        let restaurant =
            sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(restaurant)
    }

    // Suspensão de assinatura derruba a flag operacional do restaurante;
    // a aprovação de uma renovação a devolve.
    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        active: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE restaurants SET active = $1, updated_at = now() WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    // Ordem de criação do dono, usada pela regra de preço de localização
    // secundária. Desempate por id para ordem estável.
    pub async fn list_for_owner_by_creation(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Restaurant>, AppError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(
            "SELECT * FROM restaurants WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }

    pub async fn count_for_owner(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM restaurants WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }

    // Restaurantes em que o usuário tem vínculo ativo (qualquer papel).
    pub async fn list_for_member(&self, user_id: Uuid) -> Result<Vec<Restaurant>, AppError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT r.*
            FROM restaurants r
            JOIN memberships m ON m.restaurant_id = r.id
            WHERE m.user_id = $1 AND m.active = true
            ORDER BY r.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }
}
