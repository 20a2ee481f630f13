// src/middleware/subscription.rs

use axum::{extract::State, middleware::Next, response::Response};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::context::RestaurantContext,
    models::auth::User,
};

// Guarda de assinatura: bloqueia rotas operacionais quando a assinatura
// do restaurante do contexto não está válida (402 com detalhes para o
// front montar a tela de renovação). A equipe da plataforma passa
// direto, senão ninguém revisaria o pagamento de um restaurante
// bloqueado.
pub async fn subscription_guard(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    let context = request
        .extensions()
        .get::<RestaurantContext>()
        .copied()
        .ok_or(AppError::NoContext)?;

    if state.access_service.is_system_operator(user.id).await? {
        return Ok(next.run(request).await);
    }

    state
        .subscription_service
        .ensure_valid(context.0)
        .await?;

    Ok(next.run(request).await)
}
