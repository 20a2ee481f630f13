// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginPayload, RegisterPayload, User},
    models::restaurant::Restaurant,
};

// Handler de registro: conta + restaurante + assinatura trial de uma vez.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Conta e restaurante criados", body = AuthResponse),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (token, user, restaurant, _subscription) = state.auth_service.register(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user,
            restaurant_id: Some(restaurant.id),
        }),
    ))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Autenticado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (token, user) = state.auth_service.login(&payload.email, &payload.password).await?;

    // Contexto pré-selecionado para o front: o vínculo padrão do usuário.
    let restaurant_id = state
        .membership_repo
        .find_default_for_user(user.id)
        .await?
        .map(|m| m.restaurant_id);

    Ok(Json(AuthResponse {
        token,
        user,
        restaurant_id,
    }))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Usuário autenticado", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// Restaurantes em que o usuário tem vínculo ativo (troca de contexto).
#[utoipa::path(
    get,
    path = "/api/auth/me/restaurants",
    tag = "Auth",
    responses((status = 200, description = "Restaurantes do usuário", body = [Restaurant])),
    security(("api_jwt" = []))
)]
pub async fn get_my_restaurants(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Restaurant>>, AppError> {
    let restaurants = state.restaurant_service.list_for_user(user.id).await?;

    Ok(Json(restaurants))
}
