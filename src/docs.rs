// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::get_my_restaurants,

        // --- Restaurants ---
        handlers::restaurants::create_restaurant,

        // --- Team ---
        handlers::roles::list_roles,
        handlers::roles::create_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::members::list_members,
        handlers::members::invite_member,
        handlers::members::update_member,
        handlers::members::remove_member,

        // --- Subscriptions ---
        handlers::subscriptions::get_current,
        handlers::subscriptions::payment_history,
        handlers::subscriptions::submit_transaction,
        handlers::subscriptions::list_transactions,

        // --- Admin ---
        handlers::subscriptions::admin_list_transactions,
        handlers::subscriptions::review_transaction,
        handlers::subscriptions::run_sweep,
        handlers::audit::admin_list_audit,
        handlers::audit::list_restaurant_audit,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterPayload,
            models::auth::LoginPayload,
            models::auth::AuthResponse,

            // --- Restaurants ---
            models::restaurant::Restaurant,
            models::restaurant::CreateRestaurantPayload,
            handlers::restaurants::RestaurantCreatedResponse,

            // --- RBAC ---
            models::rbac::Permission,
            models::rbac::Role,
            models::rbac::Membership,
            models::rbac::MemberView,
            models::rbac::CreateRolePayload,
            models::rbac::UpdateRolePayload,
            models::rbac::InviteMemberPayload,
            models::rbac::UpdateMemberPayload,

            // --- Subscriptions ---
            models::subscription::SubscriptionStatus,
            models::subscription::Subscription,
            models::subscription::ReminderFlags,
            models::subscription::PaymentRecord,
            models::subscription::PaymentRecordStatus,
            handlers::subscriptions::SubscriptionView,

            // --- Transactions ---
            models::transaction::PaymentMethod,
            models::transaction::TransactionStatus,
            models::transaction::SubscriptionTransaction,
            models::transaction::SubmitTransactionPayload,
            models::transaction::ReviewDecision,
            models::transaction::ReviewTransactionPayload,

            // --- Audit ---
            models::audit::AuditAction,
            models::audit::AuditLog,

            // --- Varredura ---
            services::sweep::TickReport,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Restaurants", description = "Localizações do Dono"),
        (name = "Team", description = "Equipe, Papéis e Permissões"),
        (name = "Subscriptions", description = "Assinatura e Renovação"),
        (name = "Audit", description = "Trilha de Auditoria do Restaurante"),
        (name = "Admin", description = "Rotas da Equipe da Plataforma")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
