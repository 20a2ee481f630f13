// src/models/transaction.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Mpesa,
    Emola,
    // Transferência bancária; exige comprovante anexado.
    Bci,
}

impl PaymentMethod {
    pub fn requires_proof(&self) -> bool {
        matches!(self, PaymentMethod::Bci)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

// Pedido de renovação enviado pelo restaurante. Imutável depois de
// aprovado ou rejeitado.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTransaction {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub subscription_id: Uuid,

    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,

    // Número de telefone ou referência bancária.
    pub reference: String,
    pub proof_url: Option<String>,

    pub status: TransactionStatus,

    pub requested_by: Uuid,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionPayload {
    pub amount: Option<Decimal>,
    pub method: PaymentMethod,

    #[validate(length(min = 1, message = "A referência do pagamento é obrigatória."))]
    pub reference: String,

    pub proof_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTransactionPayload {
    pub decision: ReviewDecision,
    pub rejection_reason: Option<String>,
}
