// src/db/transaction_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::transaction::{PaymentMethod, SubscriptionTransaction, TransactionStatus};

#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        restaurant_id: Uuid,
        subscription_id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
        reference: &str,
        proof_url: Option<&str>,
        requested_by: Uuid,
    ) -> Result<SubscriptionTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, SubscriptionTransaction>(
            r#"
            INSERT INTO subscription_transactions
                (restaurant_id, subscription_id, amount, method, reference, proof_url, requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(subscription_id)
        .bind(amount)
        .bind(method)
        .bind(reference)
        .bind(proof_url)
        .bind(requested_by)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<SubscriptionTransaction>, AppError> {
        let transaction = sqlx::query_as::<_, SubscriptionTransaction>(
            "SELECT * FROM subscription_transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    // O guardião do fluxo de revisão: só processa transações ainda
    // pendentes. Zero linhas = alguém revisou antes (ou id inexistente).
    pub async fn mark_processed_if_pending<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        new_status: TransactionStatus,
        processed_by: Uuid,
        processed_at: DateTime<Utc>,
        rejection_reason: Option<&str>,
    ) -> Result<Option<SubscriptionTransaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, SubscriptionTransaction>(
            r#"
            UPDATE subscription_transactions
            SET status = $1, processed_by = $2, processed_at = $3,
                rejection_reason = $4, updated_at = now()
            WHERE id = $5 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(new_status)
        .bind(processed_by)
        .bind(processed_at)
        .bind(rejection_reason)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn list_for_restaurant(
        &self,
        restaurant_id: Uuid,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<SubscriptionTransaction>, AppError> {
        let transactions = sqlx::query_as::<_, SubscriptionTransaction>(
            r#"
            SELECT * FROM subscription_transactions
            WHERE restaurant_id = $1 AND ($2::transaction_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(restaurant_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    // Visão da equipe da plataforma, todos os restaurantes.
    pub async fn list_all(
        &self,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<SubscriptionTransaction>, AppError> {
        let transactions = sqlx::query_as::<_, SubscriptionTransaction>(
            r#"
            SELECT * FROM subscription_transactions
            WHERE ($1::transaction_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
