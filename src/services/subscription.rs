// src/services/subscription.rs

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{
        AuditRepository, RestaurantRepository, SubscriptionRepository, TransactionRepository,
    },
    models::{
        audit::{AuditAction, AuditEntry},
        subscription::{
            PaymentRecord, PaymentRecordStatus, Subscription, SubscriptionStatus,
        },
        transaction::{
            ReviewDecision, SubmitTransactionPayload, SubscriptionTransaction,
            TransactionStatus,
        },
    },
    services::notify::{fire_and_forget, SharedMailer, SharedNotifier},
};

#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    transaction_repo: TransactionRepository,
    restaurant_repo: RestaurantRepository,
    audit_repo: AuditRepository,
    notifier: SharedNotifier,
    mailer: SharedMailer,
    clock: Arc<dyn Clock>,
    pool: PgPool,
}

impl SubscriptionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscription_repo: SubscriptionRepository,
        transaction_repo: TransactionRepository,
        restaurant_repo: RestaurantRepository,
        audit_repo: AuditRepository,
        notifier: SharedNotifier,
        mailer: SharedMailer,
        clock: Arc<dyn Clock>,
        pool: PgPool,
    ) -> Self {
        Self {
            subscription_repo,
            transaction_repo,
            restaurant_repo,
            audit_repo,
            notifier,
            mailer,
            clock,
            pool,
        }
    }

    // Busca a assinatura do restaurante; restaurantes antigos sem registro
    // ganham um trial no ato (auto-provisionamento).
    pub async fn get_or_provision(
        &self,
        restaurant_id: Uuid,
        amount: rust_decimal::Decimal,
    ) -> Result<Subscription, AppError> {
        if let Some(subscription) = self
            .subscription_repo
            .find_by_restaurant(restaurant_id)
            .await?
        {
            return Ok(subscription);
        }

        let now = self.clock.now();
        let (start, end) = Subscription::trial_period(now);
        let subscription = self
            .subscription_repo
            .create(&self.pool, restaurant_id, amount, start, end)
            .await?;

        Ok(subscription)
    }

    pub async fn find_for_restaurant(
        &self,
        restaurant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        self.subscription_repo.find_by_restaurant(restaurant_id).await
    }

    // Bloqueio de funcionalidades: devolve a assinatura se válida, senão
    // um erro 402 com o suficiente para o cliente agir.
    pub async fn ensure_valid(&self, restaurant_id: Uuid) -> Result<Subscription, AppError> {
        let subscription = self
            .subscription_repo
            .find_by_restaurant(restaurant_id)
            .await?
            .ok_or(AppError::NotFound("Assinatura"))?;

        let now = self.clock.now();
        if subscription.is_valid(now) {
            Ok(subscription)
        } else {
            Err(AppError::SubscriptionBlocked {
                status: subscription.status,
                current_period_end: subscription.current_period_end,
                grace_end_date: subscription.grace_end_date,
                days_expired: subscription.days_expired(now),
            })
        }
    }

    // Envio de pedido de renovação. A assinatura expirada vira
    // pending_activation (sinal de visibilidade para o painel); ativa e
    // suspensa ficam como estão, para não derrubar quem ainda opera.
    pub async fn submit_transaction(
        &self,
        restaurant_id: Uuid,
        requested_by: Uuid,
        payload: &SubmitTransactionPayload,
    ) -> Result<SubscriptionTransaction, AppError> {
        if payload.method.requires_proof()
            && payload
                .proof_url
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(AppError::InvalidInput(
                "Pagamentos por transferência bancária exigem o comprovante anexado.".into(),
            ));
        }

        let subscription = self
            .subscription_repo
            .find_by_restaurant(restaurant_id)
            .await?
            .ok_or(AppError::NotFound("Assinatura"))?;

        let amount = payload.amount.unwrap_or(subscription.amount);

        let mut tx = self.pool.begin().await?;

        let transaction = self
            .transaction_repo
            .create(
                &mut *tx,
                restaurant_id,
                subscription.id,
                amount,
                payload.method,
                payload.reference.trim(),
                payload.proof_url.as_deref(),
                requested_by,
            )
            .await?;

        if subscription.status == SubscriptionStatus::Expired {
            self.subscription_repo
                .transition_status(
                    &mut *tx,
                    subscription.id,
                    subscription.version,
                    SubscriptionStatus::PendingActivation,
                )
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(requested_by),
                    action: AuditAction::TransactionCreate,
                    target_model: "SubscriptionTransaction",
                    target_id: transaction.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        json!({ "status": "pending", "amount": amount }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        // Broadcast para os revisores; nunca bloqueia o envio.
        let notifier = self.notifier.clone();
        let payload_json = json!({
            "transactionId": transaction.id,
            "restaurantId": restaurant_id,
            "amount": transaction.amount,
            "method": transaction.method,
        });
        fire_and_forget("broadcast de nova transação", async move {
            notifier
                .notify("subscription:transaction:new", payload_json)
                .await
        });

        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        restaurant_id: Uuid,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<SubscriptionTransaction>, AppError> {
        self.transaction_repo
            .list_for_restaurant(restaurant_id, status)
            .await
    }

    pub async fn list_all_transactions(
        &self,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<SubscriptionTransaction>, AppError> {
        self.transaction_repo.list_all(status).await
    }

    pub async fn payment_history(
        &self,
        restaurant_id: Uuid,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        let subscription = self
            .subscription_repo
            .find_by_restaurant(restaurant_id)
            .await?
            .ok_or(AppError::NotFound("Assinatura"))?;

        Ok(subscription.payment_history.0)
    }

    // Revisão única: aprova (e estende o período) ou rejeita (com motivo).
    // Transação + assinatura + auditoria mudam num único commit; a
    // transação só é processada se ainda estiver pendente.
    pub async fn review_transaction(
        &self,
        transaction_id: Uuid,
        reviewer_id: Uuid,
        decision: ReviewDecision,
        rejection_reason: Option<&str>,
    ) -> Result<SubscriptionTransaction, AppError> {
        let now = self.clock.now();

        let new_status = match decision {
            ReviewDecision::Approved => TransactionStatus::Approved,
            ReviewDecision::Rejected => TransactionStatus::Rejected,
        };

        if decision == ReviewDecision::Rejected
            && rejection_reason.map(str::trim).unwrap_or("").is_empty()
        {
            return Err(AppError::InvalidInput(
                "Informe o motivo da rejeição.".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let transaction = match self
            .transaction_repo
            .mark_processed_if_pending(
                &mut *tx,
                transaction_id,
                new_status,
                reviewer_id,
                now,
                rejection_reason,
            )
            .await?
        {
            Some(transaction) => transaction,
            // Zero linhas: ou a transação não existe, ou já foi revisada.
            None => {
                return if self.transaction_repo.find_by_id(transaction_id).await?.is_some() {
                    Err(AppError::AlreadyProcessed)
                } else {
                    Err(AppError::NotFound("Transação"))
                };
            }
        };

        if decision == ReviewDecision::Approved {
            let mut subscription = self
                .subscription_repo
                .find_by_id(transaction.subscription_id)
                .await?
                .ok_or(AppError::NotFound("Assinatura"))?;

            let old_status = subscription.status;

            subscription.apply_renewal(
                PaymentRecord {
                    date: now,
                    amount: transaction.amount,
                    method: transaction.method,
                    reference: transaction.reference.clone(),
                    status: PaymentRecordStatus::Completed,
                },
                now,
            );

            // CAS: se outra aprovação ou a varredura mexeu na assinatura
            // entre a leitura e aqui, o commit inteiro é desfeito.
            let subscription = self
                .subscription_repo
                .update_with_version(&mut *tx, &subscription)
                .await?;

            // A suspensão derrubou a flag operacional do restaurante; a
            // renovação aprovada é o único caminho que a devolve.
            self.restaurant_repo
                .set_active(&mut *tx, subscription.restaurant_id, true)
                .await?;

            self.audit_repo
                .append(
                    &mut *tx,
                    AuditEntry {
                        user_id: Some(reviewer_id),
                        action: AuditAction::SubscriptionStatusChange,
                        target_model: "Subscription",
                        target_id: subscription.id,
                        changes: AuditEntry::changes(
                            json!({ "status": old_status }),
                            json!({
                                "status": subscription.status,
                                "currentPeriodEnd": subscription.current_period_end,
                                "restaurantActive": true,
                            }),
                        ),
                        metadata: AuditEntry::request_metadata(
                            None,
                            None,
                            Some(subscription.restaurant_id),
                        ),
                    },
                )
                .await?;
        }

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(reviewer_id),
                    action: AuditAction::TransactionReview,
                    target_model: "SubscriptionTransaction",
                    target_id: transaction.id,
                    changes: AuditEntry::changes(
                        json!({ "status": "pending" }),
                        json!({
                            "status": transaction.status,
                            "rejectionReason": transaction.rejection_reason,
                        }),
                    ),
                    metadata: AuditEntry::request_metadata(
                        None,
                        None,
                        Some(transaction.restaurant_id),
                    ),
                },
            )
            .await?;

        tx.commit().await?;

        self.dispatch_review_outcome(&transaction, decision, now);

        Ok(transaction)
    }

    // Notificações pós-commit: confirmação por e-mail e broadcast para o
    // restaurante. Melhor-esforço.
    fn dispatch_review_outcome(
        &self,
        transaction: &SubscriptionTransaction,
        decision: ReviewDecision,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let notifier = self.notifier.clone();
        let topic = match decision {
            ReviewDecision::Approved => "subscription:transaction:approved",
            ReviewDecision::Rejected => "subscription:transaction:rejected",
        };
        let payload = json!({
            "transactionId": transaction.id,
            "restaurantId": transaction.restaurant_id,
            "status": transaction.status,
            "rejectionReason": transaction.rejection_reason,
        });
        fire_and_forget("broadcast de revisão", async move {
            notifier.notify(topic, payload).await
        });

        if decision == ReviewDecision::Approved {
            let mailer = self.mailer.clone();
            let restaurant_repo = self.restaurant_repo.clone();
            let restaurant_id = transaction.restaurant_id;
            let payment = PaymentRecord {
                date: now,
                amount: transaction.amount,
                method: transaction.method,
                reference: transaction.reference.clone(),
                status: PaymentRecordStatus::Completed,
            };
            fire_and_forget("confirmação de renovação", async move {
                if let Some(restaurant) = restaurant_repo.find_by_id(restaurant_id).await? {
                    mailer.send_renewal_confirmation(&restaurant, &payment).await?;
                }
                Ok(())
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::common::clock::test_support::FixedClock;
    use crate::db::UserRepository;
    use crate::models::subscription::{GRACE_DAYS, PERIOD_DAYS};
    use crate::models::transaction::PaymentMethod;
    use crate::services::notify::{LogMailer, LogNotifier};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn service(pool: &PgPool) -> SubscriptionService {
        SubscriptionService::new(
            SubscriptionRepository::new(pool.clone()),
            TransactionRepository::new(pool.clone()),
            RestaurantRepository::new(pool.clone()),
            AuditRepository::new(pool.clone()),
            Arc::new(LogNotifier),
            Arc::new(LogMailer),
            Arc::new(FixedClock::at(fixed_now())),
            pool.clone(),
        )
    }

    // Dono + restaurante suspenso: período vencido há 10 dias, carência
    // encerrada, flag operacional derrubada pela suspensão.
    async fn seed_suspended(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
        let now = fixed_now();

        let user = UserRepository::new(pool.clone())
            .create_user(pool, "Dona Alice", "alice@example.com", "hash", None)
            .await
            .unwrap();

        let restaurants = RestaurantRepository::new(pool.clone());
        let restaurant = restaurants
            .create(pool, "Sabores da Baía", None, None, None, user.id)
            .await
            .unwrap();

        let subscription = SubscriptionRepository::new(pool.clone())
            .create(
                pool,
                restaurant.id,
                dec!(10000),
                now - Duration::days(PERIOD_DAYS + 10),
                now - Duration::days(10),
            )
            .await
            .unwrap();

        sqlx::query(
            "UPDATE subscriptions SET status = 'suspended', grace_end_date = $1 WHERE id = $2",
        )
        .bind(now - Duration::days(10 - GRACE_DAYS))
        .bind(subscription.id)
        .execute(pool)
        .await
        .unwrap();

        restaurants.set_active(pool, restaurant.id, false).await.unwrap();

        (user.id, restaurant.id, subscription.id)
    }

    #[sqlx::test]
    async fn approving_a_renewal_reactivates_the_suspended_restaurant(pool: PgPool) {
        let (owner_id, restaurant_id, subscription_id) = seed_suspended(&pool).await;
        let service = service(&pool);

        let pending = TransactionRepository::new(pool.clone())
            .create(
                &pool,
                restaurant_id,
                subscription_id,
                dec!(10000),
                PaymentMethod::Mpesa,
                "0841234567",
                None,
                owner_id,
            )
            .await
            .unwrap();

        let reviewed = service
            .review_transaction(pending.id, owner_id, ReviewDecision::Approved, None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, TransactionStatus::Approved);

        let subscription = service
            .find_for_restaurant(restaurant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.current_period_start, fixed_now());
        assert_eq!(
            subscription.current_period_end,
            fixed_now() + Duration::days(PERIOD_DAYS)
        );
        assert!(subscription.grace_end_date.is_none());
        assert_eq!(subscription.payment_history.0.len(), 1);

        // O restaurante volta a operar no mesmo commit da aprovação.
        let restaurant = RestaurantRepository::new(pool.clone())
            .find_by_id(restaurant_id)
            .await
            .unwrap()
            .unwrap();
        assert!(restaurant.active);
    }

    #[sqlx::test]
    async fn second_review_of_the_same_transaction_is_refused(pool: PgPool) {
        let (owner_id, restaurant_id, subscription_id) = seed_suspended(&pool).await;
        let service = service(&pool);

        let pending = TransactionRepository::new(pool.clone())
            .create(
                &pool,
                restaurant_id,
                subscription_id,
                dec!(10000),
                PaymentMethod::Emola,
                "0869876543",
                None,
                owner_id,
            )
            .await
            .unwrap();

        service
            .review_transaction(pending.id, owner_id, ReviewDecision::Approved, None)
            .await
            .unwrap();

        let again = service
            .review_transaction(pending.id, owner_id, ReviewDecision::Approved, None)
            .await;
        assert!(matches!(again, Err(AppError::AlreadyProcessed)));

        // A extensão do período aconteceu exatamente uma vez.
        let subscription = service
            .find_for_restaurant(restaurant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            subscription.current_period_end,
            fixed_now() + Duration::days(PERIOD_DAYS)
        );
        assert_eq!(subscription.payment_history.0.len(), 1);

        // Id inexistente é 404, não "já processada".
        let missing = service
            .review_transaction(Uuid::new_v4(), owner_id, ReviewDecision::Approved, None)
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
