//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;
use crate::middleware::context::context_guard;
use crate::middleware::subscription::subscription_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Timer da varredura de assinaturas (lembretes, suspensão, expiração).
    let sweep_interval_hours = std::env::var("SWEEP_INTERVAL_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24);
    services::sweep::spawn_scheduler(app_state.sweep_service.clone(), sweep_interval_hours);

    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas do usuário autenticado (sem contexto de restaurante)
    let me_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/restaurants", get(handlers::auth::get_my_restaurants))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let restaurant_routes = Router::new()
        .route("/", post(handlers::restaurants::create_restaurant))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Gestão de equipe: exige assinatura válida, contexto e permissão.
    let team_routes = Router::new()
        .route(
            "/roles",
            get(handlers::roles::list_roles).post(handlers::roles::create_role),
        )
        .route(
            "/roles/{id}",
            put(handlers::roles::update_role).delete(handlers::roles::delete_role),
        )
        .route(
            "/members",
            get(handlers::members::list_members).post(handlers::members::invite_member),
        )
        .route(
            "/members/{id}",
            put(handlers::members::update_member).delete(handlers::members::remove_member),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            subscription_guard,
        ))
        .layer(axum_middleware::from_fn(context_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Assinatura e renovação: acessíveis mesmo com a assinatura bloqueada,
    // senão ninguém conseguiria pagar.
    let subscription_routes = Router::new()
        .route("/current", get(handlers::subscriptions::get_current))
        .route("/history", get(handlers::subscriptions::payment_history))
        .route(
            "/transactions",
            get(handlers::subscriptions::list_transactions)
                .post(handlers::subscriptions::submit_transaction),
        )
        .layer(axum_middleware::from_fn(context_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let audit_routes = Router::new()
        .route("/", get(handlers::audit::list_restaurant_audit))
        .layer(axum_middleware::from_fn(context_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas da equipe da plataforma (o extrator RequireSystemRole faz o portão)
    let admin_routes = Router::new()
        .route(
            "/transactions",
            get(handlers::subscriptions::admin_list_transactions),
        )
        .route(
            "/transactions/{id}/review",
            post(handlers::subscriptions::review_transaction),
        )
        .route(
            "/subscriptions/sweep",
            post(handlers::subscriptions::run_sweep),
        )
        .route("/audit", get(handlers::audit::admin_list_audit))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/auth", me_routes)
        .nest("/api/restaurants", restaurant_routes)
        .nest("/api/team", team_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/audit", audit_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
