// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermViewReports, RequirePermission, RequireSystemRole},
    models::audit::AuditLog,
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub target_model: Option<String>,
    pub target_id: Option<Uuid>,
    pub restaurant_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl AuditFilter {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

// GET /api/admin/audit — trilha completa, equipe da plataforma.
#[utoipa::path(
    get,
    path = "/api/admin/audit",
    tag = "Admin",
    responses((status = 200, description = "Trilha de auditoria", body = [AuditLog])),
    params(AuditFilter),
    security(("api_jwt" = []))
)]
pub async fn admin_list_audit(
    State(state): State<AppState>,
    _guard: RequireSystemRole,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    let logs = state
        .audit_repo
        .list(
            filter.target_model.as_deref(),
            filter.target_id,
            filter.restaurant_id,
            filter.limit(),
        )
        .await?;

    Ok(Json(logs))
}

// GET /api/audit — trilha restrita ao restaurante do contexto.
#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Audit",
    responses((status = 200, description = "Trilha do restaurante", body = [AuditLog])),
    params(
        AuditFilter,
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_restaurant_audit(
    State(state): State<AppState>,
    guard: RequirePermission<PermViewReports>,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    // O contexto da requisição manda; o filtro não pode mirar outra loja.
    let logs = state
        .audit_repo
        .list(
            filter.target_model.as_deref(),
            filter.target_id,
            Some(guard.restaurant_id),
            filter.limit(),
        )
        .await?;

    Ok(Json(logs))
}
