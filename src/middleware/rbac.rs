// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, context::RestaurantContext},
    models::{auth::User, rbac::Permission},
    services::access::ResolvedAccess,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn required() -> Permission;
}

/// 2. O Extractor (Guardião)
///
/// Resolve o vínculo do usuário no restaurante do contexto e exige a
/// permissão do tipo marcador. O vínculo resolvido fica disponível
/// para o handler (dono da requisição, papel, etc.).
pub struct RequirePermission<T> {
    pub access: ResolvedAccess,
    pub user: User,
    pub restaurant_id: uuid::Uuid,
    _marker: PhantomData<T>,
}

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let RestaurantContext(restaurant_id) =
            RestaurantContext::from_request_parts(parts, state).await?;

        let access = app_state
            .access_service
            .require_permission(user.id, restaurant_id, T::required())
            .await?;

        Ok(RequirePermission {
            access,
            user,
            restaurant_id,
            _marker: PhantomData,
        })
    }
}

// Guardião da equipe da plataforma. Não depende de contexto de
// restaurante: o papel de sistema vale em qualquer vínculo ativo.
pub struct RequireSystemRole(pub User);

impl<S> FromRequestParts<S> for RequireSystemRole
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        app_state.access_service.require_system_role(user.id).await?;

        Ok(RequireSystemRole(user))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermManageStaff;
impl PermissionDef for PermManageStaff {
    fn required() -> Permission { Permission::ManageStaff }
}

pub struct PermManageUsers;
impl PermissionDef for PermManageUsers {
    fn required() -> Permission { Permission::ManageUsers }
}

pub struct PermManageSubscription;
impl PermissionDef for PermManageSubscription {
    fn required() -> Permission { Permission::ManageSubscription }
}

pub struct PermViewReports;
impl PermissionDef for PermViewReports {
    fn required() -> Permission { Permission::ViewReports }
}
