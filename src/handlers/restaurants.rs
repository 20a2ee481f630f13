// src/handlers/restaurants.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        restaurant::{CreateRestaurantPayload, Restaurant},
        subscription::Subscription,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantCreatedResponse {
    pub restaurant: Restaurant,
    pub subscription: Subscription,
}

// POST /api/restaurants — localização adicional do mesmo dono.
#[utoipa::path(
    post,
    path = "/api/restaurants",
    tag = "Restaurants",
    request_body = CreateRestaurantPayload,
    responses(
        (status = 201, description = "Restaurante criado com assinatura trial", body = RestaurantCreatedResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateRestaurantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (restaurant, subscription) = state
        .restaurant_service
        .create_additional(user.id, &payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RestaurantCreatedResponse {
            restaurant,
            subscription,
        }),
    ))
}
