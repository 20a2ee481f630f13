// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
pub enum AuditAction {
    SubscriptionCreate,
    SubscriptionStatusChange,
    SubscriptionUpdate,
    TransactionCreate,
    TransactionReview,
    UserCreate,
    RestaurantCreate,
    RestaurantUpdate,
    MembershipCreate,
    MembershipUpdate,
    MembershipDelete,
    RoleCreate,
    RoleUpdate,
    RoleDelete,
}

// Registro de auditoria, apenas-acréscimo. `user_id` nulo = ação do sistema
// (varredura agendada, por exemplo).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_model: String,
    pub target_id: Uuid,

    #[schema(value_type = Object)]
    pub changes: serde_json::Value,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

// Entrada pronta para inserção; os helpers abaixo montam os campos JSON
// no formato {oldValue,newValue} / {ipAddress,userAgent,restaurantId}.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_model: &'static str,
    pub target_id: Uuid,
    pub changes: serde_json::Value,
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    pub fn changes(old: impl Serialize, new: impl Serialize) -> serde_json::Value {
        json!({ "oldValue": old, "newValue": new })
    }

    pub fn request_metadata(
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        restaurant_id: Option<Uuid>,
    ) -> serde_json::Value {
        json!({
            "ipAddress": ip_address,
            "userAgent": user_agent,
            "restaurantId": restaurant_id,
        })
    }

    // Assinatura da varredura automática, espelhada nos filtros do painel.
    pub fn system_metadata(restaurant_id: Uuid) -> serde_json::Value {
        json!({
            "ipAddress": "system",
            "userAgent": "auto-expiration-job",
            "restaurantId": restaurant_id,
        })
    }
}
