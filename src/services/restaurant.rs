// src/services/restaurant.rs

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{
        AuditRepository, MembershipRepository, RestaurantRepository, RoleRepository,
        SubscriptionRepository,
    },
    models::{
        audit::{AuditAction, AuditEntry},
        restaurant::{CreateRestaurantPayload, Restaurant},
        subscription::Subscription,
    },
    services::{auth::OWNER_ROLE_NAME, pricing::PricingService},
};

// Abertura de localizações adicionais pelo mesmo dono. Cada restaurante
// novo nasce com vínculo de dono e assinatura trial própria, com o
// desconto de localização secundária aplicado na cotação.
#[derive(Clone)]
pub struct RestaurantService {
    restaurant_repo: RestaurantRepository,
    membership_repo: MembershipRepository,
    role_repo: RoleRepository,
    subscription_repo: SubscriptionRepository,
    audit_repo: AuditRepository,
    pricing: PricingService,
    clock: Arc<dyn Clock>,
    pool: PgPool,
}

impl RestaurantService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        restaurant_repo: RestaurantRepository,
        membership_repo: MembershipRepository,
        role_repo: RoleRepository,
        subscription_repo: SubscriptionRepository,
        audit_repo: AuditRepository,
        pricing: PricingService,
        clock: Arc<dyn Clock>,
        pool: PgPool,
    ) -> Self {
        Self {
            restaurant_repo,
            membership_repo,
            role_repo,
            subscription_repo,
            audit_repo,
            pricing,
            clock,
            pool,
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Restaurant>, AppError> {
        self.restaurant_repo.list_for_member(user_id).await
    }

    pub async fn create_additional(
        &self,
        owner_id: Uuid,
        payload: &CreateRestaurantPayload,
    ) -> Result<(Restaurant, Subscription), AppError> {
        let owner_role = self
            .role_repo
            .find_global_by_name(OWNER_ROLE_NAME)
            .await?
            .ok_or(AppError::NotFound("Papel de dono"))?;

        let amount = self.pricing.quote_for_new_restaurant(owner_id).await?;

        let now = self.clock.now();
        let (period_start, period_end) = Subscription::trial_period(now);

        let mut tx = self.pool.begin().await?;

        let restaurant = self
            .restaurant_repo
            .create(
                &mut *tx,
                payload.name.trim(),
                payload.address.as_deref(),
                payload.phone.as_deref(),
                payload.email.as_deref(),
                owner_id,
            )
            .await?;

        // O contexto padrão do dono continua sendo o primeiro restaurante.
        self.membership_repo
            .create(&mut *tx, owner_id, restaurant.id, owner_role.id, false)
            .await?;

        let subscription = self
            .subscription_repo
            .create(&mut *tx, restaurant.id, amount, period_start, period_end)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(owner_id),
                    action: AuditAction::RestaurantCreate,
                    target_model: "Restaurant",
                    target_id: restaurant.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        json!({ "name": restaurant.name, "amount": amount }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant.id)),
                },
            )
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(owner_id),
                    action: AuditAction::SubscriptionCreate,
                    target_model: "Subscription",
                    target_id: subscription.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        json!({ "status": "trial", "amount": amount }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant.id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok((restaurant, subscription))
    }
}
