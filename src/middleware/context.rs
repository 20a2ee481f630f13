// src/middleware/context.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::common::error::AppError;

// O cabeçalho que diz em qual restaurante o usuário está operando.
const RESTAURANT_ID_HEADER: &str = "x-restaurant-id";

// Contexto de restaurante da requisição. Nenhuma consulta acontece
// aqui; a validação do vínculo fica com as guardas de permissão.
#[derive(Debug, Clone, Copy)]
pub struct RestaurantContext(pub Uuid);

// Guarda de contexto: lê o cabeçalho e insere o contexto nos
// "extensions". Cabeçalho ausente só vira erro quando algum extrator
// de fato precisar do contexto.
pub async fn context_guard(
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(RESTAURANT_ID_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Some(raw) = header {
        let restaurant_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::InvalidInput("Cabeçalho x-restaurant-id inválido".into()))?;

        request
            .extensions_mut()
            .insert(RestaurantContext(restaurant_id));
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for RestaurantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RestaurantContext>()
            .copied()
            .ok_or(AppError::NoContext)
    }
}
