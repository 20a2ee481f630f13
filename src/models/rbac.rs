// src/models/rbac.rs

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Permissões (catálogo fechado)
// ---
// As permissões do catálogo. O banco guarda os slugs em TEXT[];
// na autorização resolvemos uma única vez para este enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageTables,
    ManageMenu,
    ViewReports,
    ManageOrders,
    ManageStaff,
    TakeOrders,
    ViewOrders,
    UpdateOrderStatus,
    ViewDeliveryOrders,
    UpdateDeliveryStatus,
    ManageSubscription,
    ReviewTransactions,
}

impl Permission {
    pub fn slug(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "manage_users",
            Permission::ManageTables => "manage_tables",
            Permission::ManageMenu => "manage_menu",
            Permission::ViewReports => "view_reports",
            Permission::ManageOrders => "manage_orders",
            Permission::ManageStaff => "manage_staff",
            Permission::TakeOrders => "take_orders",
            Permission::ViewOrders => "view_orders",
            Permission::UpdateOrderStatus => "update_order_status",
            Permission::ViewDeliveryOrders => "view_delivery_orders",
            Permission::UpdateDeliveryStatus => "update_delivery_status",
            Permission::ManageSubscription => "manage_subscription",
            Permission::ReviewTransactions => "review_transactions",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manage_users" => Ok(Permission::ManageUsers),
            "manage_tables" => Ok(Permission::ManageTables),
            "manage_menu" => Ok(Permission::ManageMenu),
            "view_reports" => Ok(Permission::ViewReports),
            "manage_orders" => Ok(Permission::ManageOrders),
            "manage_staff" => Ok(Permission::ManageStaff),
            "take_orders" => Ok(Permission::TakeOrders),
            "view_orders" => Ok(Permission::ViewOrders),
            "update_order_status" => Ok(Permission::UpdateOrderStatus),
            "view_delivery_orders" => Ok(Permission::ViewDeliveryOrders),
            "update_delivery_status" => Ok(Permission::UpdateDeliveryStatus),
            "manage_subscription" => Ok(Permission::ManageSubscription),
            "review_transactions" => Ok(Permission::ReviewTransactions),
            _ => Err(()),
        }
    }
}

// Slugs aceitos como curinga na criação de papéis.
pub const WILDCARD_SLUGS: [&str; 2] = ["all", "*"];

// ---
// 2. Papel (Role)
// ---
// O que sai do banco (Tabela roles)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Gerente de Salão")]
    pub name: String,

    pub description: Option<String>,

    // Slugs crus; `capabilities()` resolve para o enum.
    #[schema(example = json!(["manage_menu", "manage_tables"]))]
    pub permissions: Vec<String>,

    // Curinga "all"/"*" resolvido no momento da escrita, não re-interpretado
    // a cada checagem.
    pub grants_all: bool,

    // Papéis de sistema são imutáveis e identificam a equipe da plataforma.
    pub is_system: bool,

    // NULL = modelo global semeado; caso contrário, papel do restaurante.
    pub restaurant_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Conjunto de capacidades resolvido uma única vez na autorização.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    pub role_name: String,
    pub is_system: bool,
    pub grants_all: bool,
    pub permissions: HashSet<Permission>,
}

impl CapabilitySet {
    // Slugs desconhecidos (dados legados) são descartados em silêncio.
    pub fn resolve(role: &Role) -> Self {
        let permissions = role
            .permissions
            .iter()
            .filter_map(|slug| Permission::from_str(slug).ok())
            .collect();

        Self {
            role_name: role.name.clone(),
            is_system: role.is_system,
            grants_all: role.grants_all,
            permissions,
        }
    }

    // A regra do portão de autorização: sistema e curinga passam direto,
    // o resto depende do catálogo de permissões.
    pub fn allows(&self, required: Permission) -> bool {
        self.is_system || self.grants_all || self.permissions.contains(&required)
    }

    // Checagem por lista de papéis, comparando nomes sem diferenciar
    // maiúsculas (o painel envia "owner", o banco guarda "Owner").
    pub fn matches_any_role(&self, allowed: &[&str]) -> bool {
        self.is_system
            || allowed
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&self.role_name))
    }
}

// Separa os slugs de permissão do curinga, no momento da escrita.
pub fn split_wildcard(slugs: &[String]) -> (Vec<String>, bool) {
    let grants_all = slugs
        .iter()
        .any(|s| WILDCARD_SLUGS.contains(&s.trim().to_ascii_lowercase().as_str()));

    let permissions = slugs
        .iter()
        .filter(|s| Permission::from_str(s).is_ok())
        .cloned()
        .collect();

    (permissions, grants_all)
}

// ---
// 3. Vínculo (Membership: User × Restaurant × Role)
// ---
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub role_id: Uuid,

    // Desativado = acesso revogado, sem apagar o histórico do vínculo.
    pub active: bool,

    // Contexto pré-selecionado no login quando o usuário tem vários restaurantes.
    pub is_default: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Vínculo expandido para listagem de equipe.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub active: bool,
    pub is_default: bool,
}

// ---
// 4. Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "O nome do papel é obrigatório."))]
    pub name: String,
    pub description: Option<String>,

    // Slugs das permissões; "all"/"*" vira grants_all.
    #[schema(example = json!(["manage_menu", "view_reports"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    pub role_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    pub role_id: Option<Uuid>,
    pub active: Option<bool>,
    pub is_default: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(permissions: Vec<&str>, grants_all: bool, is_system: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "Garçom".into(),
            description: None,
            permissions: permissions.into_iter().map(String::from).collect(),
            grants_all,
            is_system,
            restaurant_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn capability_set_resolves_known_slugs_and_drops_legacy_ones() {
        let caps = CapabilitySet::resolve(&role(
            vec!["take_orders", "manage_tables", "slug_antigo"],
            false,
            false,
        ));

        assert!(caps.allows(Permission::TakeOrders));
        assert!(caps.allows(Permission::ManageTables));
        assert!(!caps.allows(Permission::ManageMenu));
        assert_eq!(caps.permissions.len(), 2);
    }

    #[test]
    fn wildcard_and_system_roles_bypass_permission_checks() {
        let wildcard = CapabilitySet::resolve(&role(vec![], true, false));
        let system = CapabilitySet::resolve(&role(vec![], false, true));

        assert!(wildcard.allows(Permission::ReviewTransactions));
        assert!(system.allows(Permission::ReviewTransactions));
    }

    #[test]
    fn role_name_match_is_case_insensitive() {
        let caps = CapabilitySet::resolve(&role(vec![], false, false));
        assert!(caps.matches_any_role(&["garçom", "Cozinha"]));
        assert!(!caps.matches_any_role(&["Cozinha"]));
    }

    #[test]
    fn split_wildcard_detects_all_and_star() {
        let (perms, grants_all) =
            split_wildcard(&["all".to_string(), "manage_menu".to_string()]);
        assert!(grants_all);
        assert_eq!(perms, vec!["manage_menu".to_string()]);

        let (_, star) = split_wildcard(&["*".to_string()]);
        assert!(star);

        let (_, none) = split_wildcard(&["manage_menu".to_string()]);
        assert!(!none);
    }
}
