// src/handlers/members.rs

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
    models::rbac::{InviteMemberPayload, MemberView, Membership, UpdateMemberPayload},
};

// GET /api/team/members
#[utoipa::path(
    get,
    path = "/api/team/members",
    tag = "Team",
    responses((status = 200, description = "Equipe do restaurante", body = [MemberView])),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
) -> Result<Json<Vec<MemberView>>, AppError> {
    let members = state.team_service.list_members(guard.restaurant_id).await?;

    Ok(Json(members))
}

// POST /api/team/members — convite de funcionário.
#[utoipa::path(
    post,
    path = "/api/team/members",
    tag = "Team",
    request_body = InviteMemberPayload,
    responses(
        (status = 201, description = "Vínculo criado", body = Membership),
        (status = 409, description = "Usuário já vinculado a este restaurante")
    ),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn invite_member(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Json(payload): Json<InviteMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let membership = state
        .team_service
        .invite_member(guard.restaurant_id, guard.user.id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

// PUT /api/team/members/{id} — troca de papel, ativação, contexto padrão.
#[utoipa::path(
    put,
    path = "/api/team/members/{id}",
    tag = "Team",
    request_body = UpdateMemberPayload,
    responses((status = 200, description = "Vínculo atualizado", body = Membership)),
    params(
        ("id" = Uuid, Path, description = "ID do vínculo"),
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Path(membership_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberPayload>,
) -> Result<Json<Membership>, AppError> {
    let membership = state
        .team_service
        .update_member(guard.restaurant_id, guard.user.id, membership_id, &payload)
        .await?;

    Ok(Json(membership))
}

// DELETE /api/team/members/{id}
#[utoipa::path(
    delete,
    path = "/api/team/members/{id}",
    tag = "Team",
    responses((status = 204, description = "Vínculo removido")),
    params(
        ("id" = Uuid, Path, description = "ID do vínculo"),
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageStaff>,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .team_service
        .remove_member(guard.restaurant_id, guard.user.id, membership_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
