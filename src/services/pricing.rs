// src/services/pricing.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{RestaurantRepository, SettingsRepository};

// Chave do preço-base global em system_settings.
pub const BASE_PRICE_KEY: &str = "subscription_base_price";

// Usado quando a configuração ainda não foi semeada.
pub const FALLBACK_BASE_PRICE: Decimal = dec!(10000);

// Preço efetivo: o primeiro restaurante do dono paga o preço cheio;
// localizações secundárias pagam metade.
pub fn effective_price(base: Decimal, is_primary_location: bool) -> Decimal {
    if is_primary_location {
        base
    } else {
        base / dec!(2)
    }
}

#[derive(Clone)]
pub struct PricingService {
    settings_repo: SettingsRepository,
    restaurant_repo: RestaurantRepository,
}

impl PricingService {
    pub fn new(settings_repo: SettingsRepository, restaurant_repo: RestaurantRepository) -> Self {
        Self {
            settings_repo,
            restaurant_repo,
        }
    }

    pub async fn base_price(&self) -> Result<Decimal, AppError> {
        let price = self
            .settings_repo
            .get_value(BASE_PRICE_KEY)
            .await?
            .and_then(|value| serde_json::from_value::<Decimal>(value).ok())
            .unwrap_or(FALLBACK_BASE_PRICE);

        Ok(price)
    }

    // Cotação antes do INSERT: o restaurante que está para nascer é o
    // primeiro do dono se ele ainda não tem nenhum.
    pub async fn quote_for_new_restaurant(&self, owner_id: Uuid) -> Result<Decimal, AppError> {
        let base = self.base_price().await?;
        let existing = self.restaurant_repo.count_for_owner(owner_id).await?;

        Ok(effective_price(base, existing == 0))
    }

    // Preço efetivo de um restaurante já existente: ordena os restaurantes
    // do dono por criação e compara identidade com o primeiro.
    pub async fn effective_price_for(
        &self,
        restaurant_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Decimal, AppError> {
        let base = self.base_price().await?;
        let owned = self
            .restaurant_repo
            .list_for_owner_by_creation(owner_id)
            .await?;

        let is_primary = owned
            .first()
            .map(|first| first.id == restaurant_id)
            .unwrap_or(true);

        Ok(effective_price(base, is_primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_location_pays_full_base_price() {
        assert_eq!(effective_price(dec!(10000), true), dec!(10000));
    }

    #[test]
    fn secondary_locations_pay_half() {
        assert_eq!(effective_price(dec!(10000), false), dec!(5000));
        // Metade exata mesmo com base ímpar.
        assert_eq!(effective_price(dec!(15001), false), dec!(7500.5));
    }
}
