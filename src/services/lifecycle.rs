// src/services/lifecycle.rs
//
// A máquina de estados do ciclo de cobrança, pura de propósito: recebe a
// assinatura e um "agora" injetado, muta a cópia em memória e devolve os
// eventos que a varredura precisa efetivar (persistir via CAS, notificar).

use chrono::{DateTime, Duration, Utc};

use crate::models::subscription::{Subscription, SubscriptionStatus, GRACE_DAYS, PERIOD_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    // Lembrete de vencimento (7, 3 ou 1 dia antes), no máximo um por faixa.
    Reminder { days_until_due: i64 },
    // Cobrança vencida, aviso único por período.
    OverdueNotice,
    // Trial virou período pago com carência aberta.
    TrialRolledOver,
    // Cobrança atrasada sem carência registrada; carência aberta agora.
    GraceStarted,
    // Carência esgotada; o restaurante deve ser desativado.
    Suspended,
}

// Checagem diária de uma assinatura. Idempotente por construção: flags de
// lembrete e comparações de data garantem que rodar duas vezes no mesmo
// dia não produz evento novo.
pub fn run_daily_check(sub: &mut Subscription, now: DateTime<Utc>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    let days_until_due = sub.days_until_expiry(now);

    match sub.status {
        SubscriptionStatus::Trial => {
            if !reminder_due(sub, days_until_due, &mut events) && days_until_due <= 0 {
                // Fim do trial: vira período pago com pagamento pendente.
                let new_start = sub.current_period_end;
                sub.status = SubscriptionStatus::Active;
                sub.current_period_start = new_start;
                sub.current_period_end = new_start + Duration::days(PERIOD_DAYS);
                sub.grace_end_date = Some(new_start + Duration::days(GRACE_DAYS));
                sub.reminders_sent.reset();
                events.push(LifecycleEvent::TrialRolledOver);
                events.push(LifecycleEvent::OverdueNotice);
            }
        }
        SubscriptionStatus::Active => {
            reminder_due(sub, days_until_due, &mut events);

            if days_until_due < 0 {
                if sub.grace_end_date.is_none() {
                    sub.grace_end_date =
                        Some(sub.current_period_end + Duration::days(GRACE_DAYS));
                    events.push(LifecycleEvent::GraceStarted);
                }

                if !sub.reminders_sent.overdue {
                    sub.reminders_sent.overdue = true;
                    events.push(LifecycleEvent::OverdueNotice);
                }

                // Suspende apenas depois que a carência termina de fato.
                if sub.grace_end_date.map(|g| now > g).unwrap_or(false) {
                    sub.status = SubscriptionStatus::Suspended;
                    events.push(LifecycleEvent::Suspended);
                }
            }
        }
        // Suspensas, canceladas, expiradas e pendentes não recebem
        // lembrete; saem daqui só por renovação aprovada.
        _ => {}
    }

    events
}

// Dispara no máximo um lembrete por faixa. Devolve true se algum lembrete
// saiu nesta chamada (o trial não vira período pago no mesmo passo).
fn reminder_due(
    sub: &mut Subscription,
    days_until_due: i64,
    events: &mut Vec<LifecycleEvent>,
) -> bool {
    let flag = match days_until_due {
        7 => Some(&mut sub.reminders_sent.seven_days),
        3 => Some(&mut sub.reminders_sent.three_days),
        1 => Some(&mut sub.reminders_sent.one_day),
        _ => None,
    };

    match flag {
        Some(flag) if !*flag => {
            *flag = true;
            events.push(LifecycleEvent::Reminder { days_until_due });
            true
        }
        _ => false,
    }
}

// Critério da varredura de expiração. A consulta SQL pré-filtra; este
// predicado revalida antes do CAS. Trials vencidos expiram direto;
// ativas nunca expiram aqui (primeiro viram suspensas pela checagem
// diária, com direito à carência); suspensas expiram quando a carência
// termina. A varredura nunca atropela uma carência aberta.
pub fn should_expire(sub: &Subscription, now: DateTime<Utc>) -> bool {
    if sub.current_period_end >= now {
        return false;
    }

    match sub.status {
        SubscriptionStatus::Trial => true,
        SubscriptionStatus::Suspended => {
            sub.grace_end_date.map(|g| now > g).unwrap_or(true)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::ReminderFlags;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn subscription(status: SubscriptionStatus, end: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            status,
            current_period_start: end - Duration::days(PERIOD_DAYS),
            current_period_end: end,
            amount: dec!(10000),
            currency: "MT".into(),
            grace_end_date: None,
            payment_history: Json(vec![]),
            reminders_sent: ReminderFlags::default(),
            version: 1,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn reminders_fire_once_per_band() {
        let now = now();
        let mut sub = subscription(SubscriptionStatus::Trial, now + Duration::days(7));

        let first = run_daily_check(&mut sub, now);
        assert_eq!(first, vec![LifecycleEvent::Reminder { days_until_due: 7 }]);
        assert!(sub.reminders_sent.seven_days);

        // Rodar de novo no mesmo dia: nada a fazer.
        let second = run_daily_check(&mut sub, now);
        assert!(second.is_empty());
    }

    #[test]
    fn each_band_has_its_own_flag() {
        let now = now();
        let mut sub = subscription(SubscriptionStatus::Active, now + Duration::days(7));
        run_daily_check(&mut sub, now);

        sub.current_period_end = now + Duration::days(3);
        let events = run_daily_check(&mut sub, now);
        assert_eq!(events, vec![LifecycleEvent::Reminder { days_until_due: 3 }]);

        sub.current_period_end = now + Duration::days(1);
        let events = run_daily_check(&mut sub, now);
        assert_eq!(events, vec![LifecycleEvent::Reminder { days_until_due: 1 }]);
    }

    #[test]
    fn trial_rolls_over_into_paid_period_with_grace() {
        let now = now();
        let old_end = now - Duration::hours(2);
        let mut sub = subscription(SubscriptionStatus::Trial, old_end);
        sub.reminders_sent.one_day = true;

        let events = run_daily_check(&mut sub, now);

        assert_eq!(
            events,
            vec![LifecycleEvent::TrialRolledOver, LifecycleEvent::OverdueNotice]
        );
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, old_end);
        assert_eq!(sub.current_period_end, old_end + Duration::days(30));
        assert_eq!(sub.grace_end_date, Some(old_end + Duration::days(3)));
        // Flags zeradas para o novo período.
        assert!(!sub.reminders_sent.one_day);
    }

    #[test]
    fn overdue_active_gets_grace_before_suspension() {
        let now = now();
        let end = now - Duration::days(1);
        let mut sub = subscription(SubscriptionStatus::Active, end);

        let events = run_daily_check(&mut sub, now);

        // Primeira passada vencida: abre carência e avisa, sem suspender.
        assert_eq!(
            events,
            vec![LifecycleEvent::GraceStarted, LifecycleEvent::OverdueNotice]
        );
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.grace_end_date, Some(end + Duration::days(3)));

        // Mesma passada de novo: aviso já marcado, nada acontece.
        assert!(run_daily_check(&mut sub, now).is_empty());
    }

    #[test]
    fn suspension_happens_only_after_grace_runs_out() {
        let start = now();
        let end = start - Duration::days(1);
        let mut sub = subscription(SubscriptionStatus::Active, end);
        run_daily_check(&mut sub, start);

        // Ainda dentro da carência.
        let within = end + Duration::days(2);
        assert!(run_daily_check(&mut sub, within).is_empty());
        assert_eq!(sub.status, SubscriptionStatus::Active);

        // Carência esgotada.
        let after = end + Duration::days(4);
        let events = run_daily_check(&mut sub, after);
        assert_eq!(events, vec![LifecycleEvent::Suspended]);
        assert_eq!(sub.status, SubscriptionStatus::Suspended);

        // Suspensa não gera mais eventos.
        assert!(run_daily_check(&mut sub, after + Duration::days(1)).is_empty());
    }

    #[test]
    fn expiry_criterion_matches_the_sweep_query() {
        let now = now();

        // Trial vencido expira direto; ativa vencida é assunto da checagem
        // diária (carência e suspensão), nunca da varredura.
        let overdue_trial = subscription(SubscriptionStatus::Trial, now - Duration::days(1));
        let overdue_active = subscription(SubscriptionStatus::Active, now - Duration::days(4));
        let current = subscription(SubscriptionStatus::Active, now + Duration::days(5));
        let past_grace = subscription(SubscriptionStatus::Suspended, now - Duration::days(9));

        assert!(should_expire(&overdue_trial, now));
        assert!(!should_expire(&overdue_active, now));
        assert!(!should_expire(&current, now));
        assert!(should_expire(&past_grace, now));
    }

    #[test]
    fn suspended_expires_only_after_recorded_grace_runs_out() {
        let now = now();
        let mut sub = subscription(SubscriptionStatus::Suspended, now - Duration::days(5));
        sub.grace_end_date = Some(now + Duration::days(1));

        assert!(!should_expire(&sub, now));
        sub.grace_end_date = Some(now - Duration::seconds(1));
        assert!(should_expire(&sub, now));
    }

    #[test]
    fn thirty_one_days_of_silence_expire_a_fresh_trial() {
        // Cenário ponta-a-ponta: trial criado hoje, relógio avança 31 dias.
        let created = now();
        let (start, end) = Subscription::trial_period(created);
        let mut sub = subscription(SubscriptionStatus::Trial, end);
        sub.current_period_start = start;

        let later = created + Duration::days(31);
        // A checagem diária primeiro vira o trial em período pago vencido...
        let events = run_daily_check(&mut sub, later);
        assert!(events.contains(&LifecycleEvent::TrialRolledOver));
        // ...e sem a virada, a varredura o teria expirado direto.
        let mut untouched = subscription(SubscriptionStatus::Trial, end);
        assert!(should_expire(&untouched, later));
        untouched.status = SubscriptionStatus::Expired;
        assert!(!untouched.is_valid(later));
    }
}
