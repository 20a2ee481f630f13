// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{
        AuditRepository, MembershipRepository, RestaurantRepository, RoleRepository,
        SubscriptionRepository, UserRepository,
    },
    models::{
        audit::{AuditAction, AuditEntry},
        auth::{Claims, RegisterPayload, User},
        restaurant::Restaurant,
        subscription::Subscription,
    },
    services::pricing::PricingService,
};

// Nome do papel global atribuído a quem cria um restaurante.
pub const OWNER_ROLE_NAME: &str = "Owner";

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    restaurant_repo: RestaurantRepository,
    role_repo: RoleRepository,
    membership_repo: MembershipRepository,
    subscription_repo: SubscriptionRepository,
    audit_repo: AuditRepository,
    pricing: PricingService,
    clock: Arc<dyn Clock>,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UserRepository,
        restaurant_repo: RestaurantRepository,
        role_repo: RoleRepository,
        membership_repo: MembershipRepository,
        subscription_repo: SubscriptionRepository,
        audit_repo: AuditRepository,
        pricing: PricingService,
        clock: Arc<dyn Clock>,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            restaurant_repo,
            role_repo,
            membership_repo,
            subscription_repo,
            audit_repo,
            pricing,
            clock,
            jwt_secret,
            pool,
        }
    }

    // Registro: cria usuário, restaurante, vínculo de dono e assinatura
    // trial numa única transação. Qualquer falha desfaz tudo.
    pub async fn register(
        &self,
        payload: &RegisterPayload,
    ) -> Result<(String, User, Restaurant, Subscription), AppError> {
        // O hashing fica fora da transação, pois não toca no banco.
        let password_clone = payload.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let owner_role = self
            .role_repo
            .find_global_by_name(OWNER_ROLE_NAME)
            .await?
            .ok_or(AppError::NotFound("Papel de dono"))?;

        // Primeiro restaurante do dono: preço cheio por definição, mas a
        // cotação passa pela regra única de preços mesmo assim.
        let now = self.clock.now();
        let (period_start, period_end) = Subscription::trial_period(now);

        let mut tx = self.pool.begin().await?;

        let user = self
            .user_repo
            .create_user(
                &mut *tx,
                &payload.name,
                &payload.email,
                &password_hash,
                payload.phone.as_deref(),
            )
            .await?;

        let amount = self.pricing.quote_for_new_restaurant(user.id).await?;

        let restaurant = self
            .restaurant_repo
            .create(
                &mut *tx,
                &payload.restaurant_name,
                payload.restaurant_address.as_deref(),
                payload.phone.as_deref(),
                Some(&payload.email),
                user.id,
            )
            .await?;

        self.membership_repo
            .create(&mut *tx, user.id, restaurant.id, owner_role.id, true)
            .await?;

        let subscription = self
            .subscription_repo
            .create(&mut *tx, restaurant.id, amount, period_start, period_end)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(user.id),
                    action: AuditAction::SubscriptionCreate,
                    target_model: "Subscription",
                    target_id: subscription.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        serde_json::json!({ "status": "trial", "amount": amount }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant.id)),
                },
            )
            .await?;

        tx.commit().await?;

        let token = self.create_token(user.id)?;
        Ok((token, user, restaurant, subscription))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.active {
            return Err(AppError::InvalidCredentials);
        }

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(user.id)?;
        Ok((token, user))
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        // Usuário desativado não entra, mesmo com token ainda válido.
        if !user.active {
            return Err(AppError::InvalidToken);
        }

        Ok(user)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
