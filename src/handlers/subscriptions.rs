// src/handlers/subscriptions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermManageSubscription, RequirePermission, RequireSystemRole},
    models::{
        subscription::{PaymentRecord, Subscription},
        transaction::{
            ReviewTransactionPayload, SubmitTransactionPayload, SubscriptionTransaction,
            TransactionStatus,
        },
    },
    services::sweep::TickReport,
};

// Assinatura + campos derivados que o painel exibe direto.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub effective_price: Decimal,
    pub valid: bool,
    pub in_grace_period: bool,
    pub days_until_expiry: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
}

// GET /api/subscriptions/current
#[utoipa::path(
    get,
    path = "/api/subscriptions/current",
    tag = "Subscriptions",
    responses((status = 200, description = "Assinatura do restaurante", body = SubscriptionView)),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn get_current(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageSubscription>,
) -> Result<Json<SubscriptionView>, AppError> {
    let restaurant = state
        .restaurant_repo
        .find_by_id(guard.restaurant_id)
        .await?
        .ok_or(AppError::NotFound("Restaurante"))?;

    let effective_price = state
        .pricing_service
        .effective_price_for(restaurant.id, restaurant.owner_id)
        .await?;

    let subscription = state
        .subscription_service
        .get_or_provision(restaurant.id, effective_price)
        .await?;

    let now = state.clock.now();

    Ok(Json(SubscriptionView {
        valid: subscription.is_valid(now),
        in_grace_period: subscription.is_in_grace_period(now),
        days_until_expiry: subscription.days_until_expiry(now),
        effective_price,
        subscription,
    }))
}

// GET /api/subscriptions/history — histórico embutido de pagamentos.
#[utoipa::path(
    get,
    path = "/api/subscriptions/history",
    tag = "Subscriptions",
    responses((status = 200, description = "Pagamentos aprovados", body = [PaymentRecord])),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn payment_history(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageSubscription>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    let history = state
        .subscription_service
        .payment_history(guard.restaurant_id)
        .await?;

    Ok(Json(history))
}

// POST /api/subscriptions/transactions — pedido de renovação.
#[utoipa::path(
    post,
    path = "/api/subscriptions/transactions",
    tag = "Subscriptions",
    request_body = SubmitTransactionPayload,
    responses(
        (status = 201, description = "Transação registrada para revisão", body = SubscriptionTransaction)
    ),
    params(("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")),
    security(("api_jwt" = []))
)]
pub async fn submit_transaction(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageSubscription>,
    Json(payload): Json<SubmitTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let transaction = state
        .subscription_service
        .submit_transaction(guard.restaurant_id, guard.user.id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

// GET /api/subscriptions/transactions
#[utoipa::path(
    get,
    path = "/api/subscriptions/transactions",
    tag = "Subscriptions",
    responses((status = 200, description = "Transações do restaurante", body = [SubscriptionTransaction])),
    params(
        TransactionFilter,
        ("x-restaurant-id" = Uuid, Header, description = "ID do restaurante")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    guard: RequirePermission<PermManageSubscription>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<SubscriptionTransaction>>, AppError> {
    let transactions = state
        .subscription_service
        .list_transactions(guard.restaurant_id, filter.status)
        .await?;

    Ok(Json(transactions))
}

// ---
// Rotas da equipe da plataforma
// ---

// GET /api/admin/transactions — fila de revisão, todas as lojas.
#[utoipa::path(
    get,
    path = "/api/admin/transactions",
    tag = "Admin",
    responses((status = 200, description = "Transações de todas as lojas", body = [SubscriptionTransaction])),
    params(TransactionFilter),
    security(("api_jwt" = []))
)]
pub async fn admin_list_transactions(
    State(state): State<AppState>,
    _guard: RequireSystemRole,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<SubscriptionTransaction>>, AppError> {
    let transactions = state
        .subscription_service
        .list_all_transactions(filter.status)
        .await?;

    Ok(Json(transactions))
}

// POST /api/admin/transactions/{id}/review
#[utoipa::path(
    post,
    path = "/api/admin/transactions/{id}/review",
    tag = "Admin",
    request_body = ReviewTransactionPayload,
    responses(
        (status = 200, description = "Transação revisada", body = SubscriptionTransaction),
        (status = 409, description = "Transação já revisada")
    ),
    params(("id" = Uuid, Path, description = "ID da transação")),
    security(("api_jwt" = []))
)]
pub async fn review_transaction(
    State(state): State<AppState>,
    guard: RequireSystemRole,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<ReviewTransactionPayload>,
) -> Result<Json<SubscriptionTransaction>, AppError> {
    let transaction = state
        .subscription_service
        .review_transaction(
            transaction_id,
            guard.0.id,
            payload.decision,
            payload.rejection_reason.as_deref(),
        )
        .await?;

    Ok(Json(transaction))
}

// POST /api/admin/subscriptions/sweep — varredura sob demanda.
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/sweep",
    tag = "Admin",
    responses((status = 200, description = "Resultado da varredura", body = TickReport)),
    security(("api_jwt" = []))
)]
pub async fn run_sweep(
    State(state): State<AppState>,
    _guard: RequireSystemRole,
) -> Result<Json<TickReport>, AppError> {
    let report = state.sweep_service.tick().await?;

    Ok(Json(report))
}
