// src/services/notify.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::restaurant::Restaurant;
use crate::models::subscription::PaymentRecord;

// ---
// Colaboradores externos (caixas-pretas)
// ---
// Ambos são melhor-esforço: falha vira log de warning, nunca bloqueia a
// transição de estado que os disparou.

// Canal de broadcast em tempo real (painel admin, app do dono).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic: &str, payload: serde_json::Value) -> anyhow::Result<()>;
}

// Envio de e-mail/SMS para os donos dos restaurantes.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_payment_reminder(
        &self,
        restaurant: &Restaurant,
        days_until_due: i64,
    ) -> anyhow::Result<()>;

    async fn send_suspension_notice(&self, restaurant: &Restaurant) -> anyhow::Result<()>;

    async fn send_renewal_confirmation(
        &self,
        restaurant: &Restaurant,
        payment: &PaymentRecord,
    ) -> anyhow::Result<()>;
}

// ---
// Implementações de log (SMTP/push reais ficam fora deste serviço)
// ---

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, topic: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        tracing::info!(topic, %payload, "broadcast");
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl MessageSender for LogMailer {
    async fn send_payment_reminder(
        &self,
        restaurant: &Restaurant,
        days_until_due: i64,
    ) -> anyhow::Result<()> {
        if days_until_due < 0 {
            tracing::info!(restaurant = %restaurant.name, "aviso de pagamento em atraso");
        } else {
            tracing::info!(
                restaurant = %restaurant.name,
                days_until_due,
                "lembrete de vencimento"
            );
        }
        Ok(())
    }

    async fn send_suspension_notice(&self, restaurant: &Restaurant) -> anyhow::Result<()> {
        tracing::info!(restaurant = %restaurant.name, "aviso de suspensão");
        Ok(())
    }

    async fn send_renewal_confirmation(
        &self,
        restaurant: &Restaurant,
        payment: &PaymentRecord,
    ) -> anyhow::Result<()> {
        tracing::info!(
            restaurant = %restaurant.name,
            amount = %payment.amount,
            "confirmação de renovação"
        );
        Ok(())
    }
}

// Dispara em segundo plano e registra a falha como UPSTREAM_FAILURE.
// O chamador segue em frente imediatamente.
pub fn fire_and_forget<F>(what: &'static str, fut: F)
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = fut.await {
            tracing::warn!(what, error = %err, "UPSTREAM_FAILURE: entrega melhor-esforço falhou");
        }
    });
}

pub type SharedNotifier = Arc<dyn Notifier>;
pub type SharedMailer = Arc<dyn MessageSender>;
