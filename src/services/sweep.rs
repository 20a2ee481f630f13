// src/services/sweep.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{AuditRepository, RestaurantRepository, SubscriptionRepository},
    models::{
        audit::{AuditAction, AuditEntry},
        restaurant::Restaurant,
        subscription::{Subscription, SubscriptionStatus},
    },
    services::{
        lifecycle::{self, LifecycleEvent},
        notify::{fire_and_forget, SharedMailer},
    },
};

// Chave do advisory lock que serializa varreduras entre instâncias.
const SWEEP_LOCK_KEY: i64 = 0x71_6d_65_6e_75; // "qmenu"

#[derive(Debug, Default, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub checked: usize,
    pub reminders_sent: usize,
    pub trials_rolled_over: usize,
    pub suspended: usize,
    pub expired: usize,
    pub skipped: bool,
}

// A varredura agendada. Um "tick" roda a checagem diária (lembretes,
// virada de trial, carência, suspensão) e depois a varredura de
// expiração. Chamável pelo timer e sob demanda pelo painel.
#[derive(Clone)]
pub struct SweepService {
    subscription_repo: SubscriptionRepository,
    restaurant_repo: RestaurantRepository,
    audit_repo: AuditRepository,
    mailer: SharedMailer,
    clock: Arc<dyn Clock>,
    pool: PgPool,
}

impl SweepService {
    pub fn new(
        subscription_repo: SubscriptionRepository,
        restaurant_repo: RestaurantRepository,
        audit_repo: AuditRepository,
        mailer: SharedMailer,
        clock: Arc<dyn Clock>,
        pool: PgPool,
    ) -> Self {
        Self {
            subscription_repo,
            restaurant_repo,
            audit_repo,
            mailer,
            clock,
            pool,
        }
    }

    // Execuções sobrepostas (duas instâncias, ou timer + sob demanda) são
    // serializadas por um advisory lock no Postgres: quem não pega o lock
    // simplesmente pula a rodada.
    pub async fn tick(&self) -> Result<TickReport, AppError> {
        let mut conn = self.pool.acquire().await?;

        let locked: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(SWEEP_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await?;

        if !locked.0 {
            tracing::info!("varredura já em execução em outra instância; pulando");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        }

        let now = self.clock.now();
        let result = self.run_passes(now).await;

        // Solta o lock mesmo se a varredura falhou no meio.
        let _ = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(SWEEP_LOCK_KEY)
            .execute(&mut *conn)
            .await;

        result
    }

    // A varredura de expiração roda antes da checagem diária: um trial
    // vencido expira em vez de virar período pago, e uma suspensão recém
    // aplicada fica observável até o próximo tick.
    async fn run_passes(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let expired = self.expiry_sweep(now).await?;
        let mut report = self.daily_check(now).await?;
        report.expired = expired;
        tracing::info!(
            checked = report.checked,
            reminders = report.reminders_sent,
            suspended = report.suspended,
            expired = report.expired,
            "varredura de assinaturas concluída"
        );
        Ok(report)
    }

    // Passa por todas as assinaturas trial/active. Falha em um registro é
    // logada e a varredura segue para o próximo.
    pub async fn daily_check(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let candidates = self.subscription_repo.list_lifecycle_candidates().await?;
        let mut report = TickReport {
            checked: candidates.len(),
            ..TickReport::default()
        };

        for mut sub in candidates {
            let events = lifecycle::run_daily_check(&mut sub, now);
            if events.is_empty() {
                continue;
            }

            match self.apply_daily_events(&sub, &events).await {
                Ok(()) => {
                    for event in &events {
                        match event {
                            LifecycleEvent::Reminder { .. }
                            | LifecycleEvent::OverdueNotice => report.reminders_sent += 1,
                            LifecycleEvent::TrialRolledOver => report.trials_rolled_over += 1,
                            LifecycleEvent::Suspended => report.suspended += 1,
                            LifecycleEvent::GraceStarted => {}
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        subscription = %sub.id,
                        error = %err,
                        "falha ao processar assinatura; seguindo para a próxima"
                    );
                }
            }
        }

        Ok(report)
    }

    // Persiste o resultado da checagem num único commit e dispara as
    // mensagens depois. Suspensão também derruba a flag do restaurante.
    async fn apply_daily_events(
        &self,
        sub: &Subscription,
        events: &[LifecycleEvent],
    ) -> Result<(), AppError> {
        let suspended = events.contains(&LifecycleEvent::Suspended);

        let mut tx = self.pool.begin().await?;

        self.subscription_repo.update_with_version(&mut *tx, sub).await?;

        if suspended {
            self.restaurant_repo
                .set_active(&mut *tx, sub.restaurant_id, false)
                .await?;

            self.audit_repo
                .append(
                    &mut *tx,
                    AuditEntry {
                        user_id: None,
                        action: AuditAction::SubscriptionStatusChange,
                        target_model: "Subscription",
                        target_id: sub.id,
                        changes: AuditEntry::changes(
                            serde_json::json!({ "status": "active" }),
                            serde_json::json!({ "status": "suspended" }),
                        ),
                        metadata: AuditEntry::system_metadata(sub.restaurant_id),
                    },
                )
                .await?;
        }

        tx.commit().await?;

        if let Some(restaurant) = self.restaurant_repo.find_by_id(sub.restaurant_id).await? {
            for event in events {
                self.dispatch_event(&restaurant, sub, *event);
            }
        }

        Ok(())
    }

    fn dispatch_event(&self, restaurant: &Restaurant, sub: &Subscription, event: LifecycleEvent) {
        let mailer = self.mailer.clone();
        let restaurant = restaurant.clone();

        match event {
            LifecycleEvent::Reminder { days_until_due } => {
                fire_and_forget("lembrete de vencimento", async move {
                    mailer.send_payment_reminder(&restaurant, days_until_due).await
                });
            }
            // A virada de trial e o início de carência avisam com o mesmo
            // aviso de atraso (dias negativos), como o painel espera.
            LifecycleEvent::OverdueNotice => {
                let days = sub.days_until_expiry(self.clock.now()).min(-1);
                fire_and_forget("aviso de atraso", async move {
                    mailer.send_payment_reminder(&restaurant, days).await
                });
            }
            LifecycleEvent::Suspended => {
                fire_and_forget("aviso de suspensão", async move {
                    mailer.send_suspension_notice(&restaurant).await
                });
            }
            LifecycleEvent::TrialRolledOver | LifecycleEvent::GraceStarted => {}
        }
    }

    // Varredura de expiração: período vencido sem renovação vira expired,
    // com entrada de auditoria assinada pelo sistema (user nulo). Devolve
    // quantas assinaturas foram transicionadas.
    pub async fn expiry_sweep(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let candidates = self.subscription_repo.list_expired_candidates(now).await?;
        tracing::info!(candidates = candidates.len(), "varredura de expiração");

        let mut expired = 0;

        for sub in candidates {
            if !lifecycle::should_expire(&sub, now) {
                continue;
            }

            match self.expire_one(&sub).await {
                Ok(()) => expired += 1,
                Err(err) => {
                    tracing::warn!(
                        subscription = %sub.id,
                        error = %err,
                        "falha ao expirar assinatura; seguindo para a próxima"
                    );
                }
            }
        }

        Ok(expired)
    }

    async fn expire_one(&self, sub: &Subscription) -> Result<(), AppError> {
        let old_status = sub.status;

        let mut tx = self.pool.begin().await?;

        self.subscription_repo
            .transition_status(&mut *tx, sub.id, sub.version, SubscriptionStatus::Expired)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: None,
                    action: AuditAction::SubscriptionStatusChange,
                    target_model: "Subscription",
                    target_id: sub.id,
                    changes: AuditEntry::changes(
                        serde_json::json!({ "status": old_status }),
                        serde_json::json!({ "status": "expired" }),
                    ),
                    metadata: AuditEntry::system_metadata(sub.restaurant_id),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

// Timer diário. O tick também pode ser disparado sob demanda pela rota
// administrativa; o advisory lock cuida da sobreposição.
pub fn spawn_scheduler(service: Arc<SweepService>, interval_hours: u64) {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(interval_hours * 3600);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(err) = service.tick().await {
                tracing::error!(error = %err, "varredura agendada falhou");
            }
        }
    });
}
