// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::clock::{Clock, SystemClock},
    db::{
        AuditRepository, MembershipRepository, RestaurantRepository, RoleRepository,
        SettingsRepository, SubscriptionRepository, TransactionRepository, UserRepository,
    },
    services::{
        access::AccessService,
        auth::AuthService,
        notify::{LogMailer, LogNotifier, SharedMailer, SharedNotifier},
        pricing::PricingService,
        restaurant::RestaurantService,
        subscription::SubscriptionService,
        sweep::SweepService,
        team::TeamService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub clock: Arc<dyn Clock>,

    // Repositórios que os handlers consultam direto
    pub membership_repo: MembershipRepository,
    pub restaurant_repo: RestaurantRepository,
    pub audit_repo: AuditRepository,

    // Serviços
    pub auth_service: AuthService,
    pub access_service: AccessService,
    pub pricing_service: PricingService,
    pub subscription_service: SubscriptionService,
    pub restaurant_service: RestaurantService,
    pub team_service: TeamService,
    pub sweep_service: Arc<SweepService>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::build(db_pool, jwt_secret))
    }

    // --- Monta o gráfico de dependências ---
    pub fn build(db_pool: PgPool, jwt_secret: String) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier: SharedNotifier = Arc::new(LogNotifier);
        let mailer: SharedMailer = Arc::new(LogMailer);

        let user_repo = UserRepository::new(db_pool.clone());
        let restaurant_repo = RestaurantRepository::new(db_pool.clone());
        let role_repo = RoleRepository::new(db_pool.clone());
        let membership_repo = MembershipRepository::new(db_pool.clone());
        let subscription_repo = SubscriptionRepository::new(db_pool.clone());
        let transaction_repo = TransactionRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let pricing_service = PricingService::new(settings_repo, restaurant_repo.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            restaurant_repo.clone(),
            role_repo.clone(),
            membership_repo.clone(),
            subscription_repo.clone(),
            audit_repo.clone(),
            pricing_service.clone(),
            clock.clone(),
            jwt_secret,
            db_pool.clone(),
        );

        let access_service = AccessService::new(membership_repo.clone(), role_repo.clone());

        let subscription_service = SubscriptionService::new(
            subscription_repo.clone(),
            transaction_repo,
            restaurant_repo.clone(),
            audit_repo.clone(),
            notifier,
            mailer.clone(),
            clock.clone(),
            db_pool.clone(),
        );

        let restaurant_service = RestaurantService::new(
            restaurant_repo.clone(),
            membership_repo.clone(),
            role_repo.clone(),
            subscription_repo.clone(),
            audit_repo.clone(),
            pricing_service.clone(),
            clock.clone(),
            db_pool.clone(),
        );

        let team_service = TeamService::new(
            role_repo,
            membership_repo.clone(),
            user_repo,
            audit_repo.clone(),
            db_pool.clone(),
        );

        let sweep_service = Arc::new(SweepService::new(
            subscription_repo,
            restaurant_repo.clone(),
            audit_repo.clone(),
            mailer,
            clock.clone(),
            db_pool.clone(),
        ));

        Self {
            db_pool,
            clock,
            membership_repo,
            restaurant_repo,
            audit_repo,
            auth_service,
            access_service,
            pricing_service,
            subscription_service,
            restaurant_service,
            team_service,
            sweep_service,
        }
    }
}
