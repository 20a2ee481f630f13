// src/models/subscription.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::transaction::PaymentMethod;

// Dias de período e de carência do plano mensal.
pub const PERIOD_DAYS: i64 = 30;
pub const GRACE_DAYS: i64 = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    // Renovação enviada com a assinatura já expirada; sinal de visibilidade
    // para o painel, sem liberar acesso.
    PendingActivation,
    Suspended,
    Cancelled,
    Expired,
}

// Um pagamento confirmado, embutido no histórico da assinatura (JSONB).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: String,
    pub status: PaymentRecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRecordStatus {
    Pending,
    Completed,
    Failed,
}

// Flags de lembrete, uma por faixa. Garantem envio único por período;
// zeradas a cada renovação.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderFlags {
    #[sqlx(rename = "reminder_seven_days")]
    pub seven_days: bool,
    #[sqlx(rename = "reminder_three_days")]
    pub three_days: bool,
    #[sqlx(rename = "reminder_one_day")]
    pub one_day: bool,
    #[sqlx(rename = "reminder_overdue")]
    pub overdue: bool,
}

impl ReminderFlags {
    pub fn reset(&mut self) {
        *self = ReminderFlags::default();
    }
}

// O razão de cobrança: um registro por restaurante, nunca apagado.
// `version` guarda o compare-and-swap de toda transição de estado.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub status: SubscriptionStatus,

    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,

    pub amount: Decimal,
    pub currency: String,

    // Fim da carência; presente apenas quando a cobrança está atrasada.
    pub grace_end_date: Option<DateTime<Utc>>,

    #[schema(value_type = Vec<PaymentRecord>)]
    pub payment_history: Json<Vec<PaymentRecord>>,

    #[sqlx(flatten)]
    pub reminders_sent: ReminderFlags,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    // Valores de uma assinatura recém-provisionada (teste grátis de 30 dias).
    // O id/versão definitivos vêm do INSERT.
    pub fn trial_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now + Duration::days(PERIOD_DAYS))
    }

    // O predicado que libera o acesso a funcionalidades no sistema inteiro:
    // trial/active valem; suspensa vale apenas dentro da carência.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Trial | SubscriptionStatus::Active => true,
            SubscriptionStatus::Suspended => self
                .grace_end_date
                .map(|grace| now < grace)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_in_grace_period(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Suspended
            && self.grace_end_date.map(|g| now < g).unwrap_or(false)
    }

    // Dias até o vencimento, arredondando para cima (o painel mostra
    // "faltam N dias"). Negativo quando já venceu.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.current_period_end - now).num_seconds();
        secs.div_euclid(86_400) + i64::from(secs.rem_euclid(86_400) > 0)
    }

    // Dias corridos desde o vencimento; 0 se ainda vigente.
    pub fn days_expired(&self, now: DateTime<Utc>) -> i64 {
        if now <= self.current_period_end {
            0
        } else {
            (now - self.current_period_end).num_days()
        }
    }

    // Aplica uma renovação aprovada. Cumulativa quando o período ainda
    // vigora (soma 30 dias ao fim existente); reinício quando já venceu
    // (novo ciclo inteiro, início e fim, ancorado em agora).
    pub fn apply_renewal(&mut self, payment: PaymentRecord, now: DateTime<Utc>) {
        let base = if self.current_period_end > now {
            self.current_period_end
        } else {
            self.current_period_start = now;
            now
        };

        self.current_period_end = base + Duration::days(PERIOD_DAYS);
        self.status = SubscriptionStatus::Active;
        self.grace_end_date = None;
        self.payment_history.0.push(payment);
        self.reminders_sent.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn subscription(status: SubscriptionStatus, end_in_days: i64) -> Subscription {
        let now = fixed_now();
        Subscription {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            status,
            current_period_start: now - Duration::days(PERIOD_DAYS - end_in_days),
            current_period_end: now + Duration::days(end_in_days),
            amount: dec!(10000),
            currency: "MT".into(),
            grace_end_date: None,
            payment_history: Json(vec![]),
            reminders_sent: ReminderFlags::default(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment() -> PaymentRecord {
        PaymentRecord {
            date: fixed_now(),
            amount: dec!(10000),
            method: PaymentMethod::Mpesa,
            reference: "0841234567".into(),
            status: PaymentRecordStatus::Completed,
        }
    }

    #[test]
    fn validity_predicate_truth_table() {
        let now = fixed_now();

        assert!(subscription(SubscriptionStatus::Trial, 10).is_valid(now));
        assert!(subscription(SubscriptionStatus::Active, 10).is_valid(now));
        assert!(!subscription(SubscriptionStatus::Expired, -1).is_valid(now));
        assert!(!subscription(SubscriptionStatus::Cancelled, 10).is_valid(now));
        assert!(!subscription(SubscriptionStatus::PendingActivation, -1).is_valid(now));

        // Suspensa só vale dentro da carência.
        let mut suspended = subscription(SubscriptionStatus::Suspended, -2);
        assert!(!suspended.is_valid(now));
        suspended.grace_end_date = Some(now + Duration::days(1));
        assert!(suspended.is_valid(now));
        suspended.grace_end_date = Some(now - Duration::seconds(1));
        assert!(!suspended.is_valid(now));
    }

    #[test]
    fn renewal_is_cumulative_while_period_still_runs() {
        let now = fixed_now();
        let mut sub = subscription(SubscriptionStatus::Suspended, 5);
        let old_start = sub.current_period_start;
        let old_end = sub.current_period_end;

        sub.apply_renewal(payment(), now);

        // Exatamente 30 dias somados ao fim *existente*; o início não muda.
        assert_eq!(sub.current_period_start, old_start);
        assert_eq!(sub.current_period_end, old_end + Duration::days(30));
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.payment_history.0.len(), 1);
        assert!(sub.grace_end_date.is_none());
    }

    #[test]
    fn renewal_resets_from_now_when_period_already_elapsed() {
        let now = fixed_now();
        let mut sub = subscription(SubscriptionStatus::Expired, -10);

        sub.apply_renewal(payment(), now);

        // O ciclo inteiro reinicia: início em agora, fim 30 dias depois.
        assert_eq!(sub.current_period_start, now);
        assert_eq!(sub.current_period_end, now + Duration::days(30));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn renewal_clears_reminder_flags() {
        let now = fixed_now();
        let mut sub = subscription(SubscriptionStatus::Active, -1);
        sub.reminders_sent = ReminderFlags {
            seven_days: true,
            three_days: true,
            one_day: true,
            overdue: true,
        };

        sub.apply_renewal(payment(), now);

        assert!(!sub.reminders_sent.seven_days);
        assert!(!sub.reminders_sent.three_days);
        assert!(!sub.reminders_sent.one_day);
        assert!(!sub.reminders_sent.overdue);
    }

    #[test]
    fn day_counts_round_like_the_dashboard_expects() {
        let now = fixed_now();

        // Venceu há 1 segundo: "faltam 0 dias", "0 dias expirada".
        let mut sub = subscription(SubscriptionStatus::Active, 0);
        sub.current_period_end = now - Duration::seconds(1);
        assert_eq!(sub.days_until_expiry(now), 0);
        assert_eq!(sub.days_expired(now), 0);

        // Vence em 1 segundo: teto de 1 dia.
        sub.current_period_end = now + Duration::seconds(1);
        assert_eq!(sub.days_until_expiry(now), 1);

        sub.current_period_end = now - Duration::days(10);
        assert_eq!(sub.days_until_expiry(now), -10);
        assert_eq!(sub.days_expired(now), 10);
    }

    #[test]
    fn trial_period_spans_thirty_days() {
        let now = fixed_now();
        let (start, end) = Subscription::trial_period(now);
        assert_eq!(start, now);
        assert_eq!(end, now + Duration::days(30));
    }
}
