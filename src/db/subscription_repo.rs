// src/db/subscription_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::subscription::{Subscription, SubscriptionStatus};

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        amount: Decimal,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (restaurant_id, status, current_period_start, current_period_end, amount)
            VALUES ($1, 'trial', $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(period_start)
        .bind(period_end)
        .bind(amount)
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(subscription)
    }

    pub async fn find_by_restaurant(
        &self,
        restaurant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE restaurant_id = $1",
        )
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    // Toda transição de estado passa por aqui: UPDATE condicionado à versão
    // lida. Zero linhas afetadas = outra operação ganhou a corrida.
    pub async fn update_with_version<'e, E>(
        &self,
        executor: E,
        sub: &Subscription,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = $1,
                current_period_start = $2,
                current_period_end = $3,
                amount = $4,
                grace_end_date = $5,
                payment_history = $6,
                reminder_seven_days = $7,
                reminder_three_days = $8,
                reminder_one_day = $9,
                reminder_overdue = $10,
                version = version + 1,
                updated_at = now()
            WHERE id = $11 AND version = $12
            RETURNING *
            "#,
        )
        .bind(sub.status)
        .bind(sub.current_period_start)
        .bind(sub.current_period_end)
        .bind(sub.amount)
        .bind(sub.grace_end_date)
        .bind(Json(&sub.payment_history.0))
        .bind(sub.reminders_sent.seven_days)
        .bind(sub.reminders_sent.three_days)
        .bind(sub.reminders_sent.one_day)
        .bind(sub.reminders_sent.overdue)
        .bind(sub.id)
        .bind(sub.version)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::Conflict)
    }

    // Candidatas da checagem diária (lembretes, virada de trial, carência).
    pub async fn list_lifecycle_candidates(&self) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE status IN ('trial', 'active') ORDER BY current_period_end",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    // Candidatas da varredura de expiração: trial com período vencido, ou
    // suspensa cuja carência já terminou.
    pub async fn list_expired_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, AppError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE current_period_end < $1
              AND (status = 'trial'
                   OR (status = 'suspended'
                       AND (grace_end_date IS NULL OR grace_end_date < $1)))
            ORDER BY current_period_end
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    // Transição simples de status com CAS, usada quando nenhum outro campo
    // muda (expiração, pending_activation).
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        version: i64,
        new_status: SubscriptionStatus,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = $1, version = version + 1, updated_at = now()
            WHERE id = $2 AND version = $3
            RETURNING *
            "#,
        )
        .bind(new_status)
        .bind(id)
        .bind(version)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::db::{RestaurantRepository, UserRepository};
    use crate::models::subscription::PERIOD_DAYS;

    async fn seed_subscription(pool: &PgPool) -> Subscription {
        let user = UserRepository::new(pool.clone())
            .create_user(pool, "Dono", "dono@example.com", "hash", None)
            .await
            .unwrap();

        let restaurant = RestaurantRepository::new(pool.clone())
            .create(pool, "Quiosque do Cais", None, None, None, user.id)
            .await
            .unwrap();

        let now = Utc::now();
        SubscriptionRepository::new(pool.clone())
            .create(
                pool,
                restaurant.id,
                dec!(10000),
                now,
                now + Duration::days(PERIOD_DAYS),
            )
            .await
            .unwrap()
    }

    // Duas escritas partindo da mesma versão lida: a primeira passa, a
    // segunda perde a corrida. O registro fica com uma única extensão.
    #[sqlx::test]
    async fn stale_version_update_loses_the_race(pool: PgPool) {
        let repo = SubscriptionRepository::new(pool.clone());
        let created = seed_subscription(&pool).await;

        let mut first = created.clone();
        first.current_period_end += Duration::days(PERIOD_DAYS);
        let updated = repo.update_with_version(&pool, &first).await.unwrap();
        assert_eq!(updated.version, created.version + 1);
        assert_eq!(updated.current_period_end, first.current_period_end);

        let mut second = created.clone();
        second.current_period_end += Duration::days(PERIOD_DAYS);
        let lost = repo.update_with_version(&pool, &second).await;
        assert!(matches!(lost, Err(AppError::Conflict)));

        let stored = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.version, created.version + 1);
        assert_eq!(stored.current_period_end, updated.current_period_end);
    }

    #[sqlx::test]
    async fn status_transition_requires_the_current_version(pool: PgPool) {
        let repo = SubscriptionRepository::new(pool.clone());
        let created = seed_subscription(&pool).await;

        let expired = repo
            .transition_status(&pool, created.id, created.version, SubscriptionStatus::Expired)
            .await
            .unwrap();
        assert_eq!(expired.status, SubscriptionStatus::Expired);
        assert_eq!(expired.version, created.version + 1);

        // Repetir com a versão antiga não reaplica a transição.
        let stale = repo
            .transition_status(&pool, created.id, created.version, SubscriptionStatus::Cancelled)
            .await;
        assert!(matches!(stale, Err(AppError::Conflict)));

        let stored = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Expired);
    }
}
