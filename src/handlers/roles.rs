// src/handlers/roles.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermManageStaff, RequirePermission},
    models::rbac::{CreateRolePayload, Role, UpdateRolePayload},
};

// GET /api/team/roles — modelos globais + papéis próprios.
#[utoipa::path(
    get,
    path = "/api/team/roles",
    tag = "Team",
    responses((status = 200, description = "Papéis disponíveis", body = [Role])),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
) -> Result<Json<Vec<Role>>, AppError> {
    let roles = state.team_service.list_roles(guard.restaurant_id).await?;

    Ok(Json(roles))
}

// POST /api/team/roles
#[utoipa::path(
    post,
    path = "/api/team/roles",
    tag = "Team",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Papel criado", body = Role),
        (status = 409, description = "Nome de papel já usado")
    ),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let role = state
        .team_service
        .create_role(guard.restaurant_id, guard.user.id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(role)))
}

// PUT /api/team/roles/{id}
#[utoipa::path(
    put,
    path = "/api/team/roles/{id}",
    tag = "Team",
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Papel atualizado", body = Role),
        (status = 403, description = "Papel de sistema ou modelo global")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do papel"),
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<Role>, AppError> {
    let role = state
        .team_service
        .update_role(guard.restaurant_id, guard.user.id, role_id, &payload)
        .await?;

    Ok(Json(role))
}

// DELETE /api/team/roles/{id}
#[utoipa::path(
    delete,
    path = "/api/team/roles/{id}",
    tag = "Team",
    responses(
        (status = 204, description = "Papel removido"),
        (status = 409, description = "Papel em uso por algum vínculo")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do papel"),
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .team_service
        .delete_role(guard.restaurant_id, guard.user.id, role_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
