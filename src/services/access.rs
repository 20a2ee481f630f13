// src/services/access.rs

use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{MembershipRepository, RoleRepository};
use crate::models::rbac::{CapabilitySet, Membership, Permission};

// Resultado da resolução (usuário, restaurante) -> papel efetivo.
#[derive(Debug, Clone)]
pub struct ResolvedAccess {
    pub membership: Membership,
    pub capabilities: CapabilitySet,
}

// O portão de autorização. Somente leitura, sem efeitos colaterais;
// seguro para qualquer volume de checagens concorrentes.
#[derive(Clone)]
pub struct AccessService {
    membership_repo: MembershipRepository,
    role_repo: RoleRepository,
}

impl AccessService {
    pub fn new(membership_repo: MembershipRepository, role_repo: RoleRepository) -> Self {
        Self {
            membership_repo,
            role_repo,
        }
    }

    // Vínculo inexistente e vínculo desativado produzem o mesmo erro:
    // para quem chama, o acesso simplesmente não existe (mais).
    pub async fn resolve(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
    ) -> Result<ResolvedAccess, AppError> {
        let membership = self
            .membership_repo
            .find_for_user_and_restaurant(user_id, restaurant_id)
            .await?
            .ok_or(AppError::AccessRevoked)?;

        if !membership.active {
            return Err(AppError::AccessRevoked);
        }

        let role = self
            .role_repo
            .find_by_id(membership.role_id)
            .await?
            .ok_or(AppError::NotFound("Papel"))?;

        Ok(ResolvedAccess {
            membership,
            capabilities: CapabilitySet::resolve(&role),
        })
    }

    pub async fn require_permission(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
        required: Permission,
    ) -> Result<ResolvedAccess, AppError> {
        let access = self.resolve(user_id, restaurant_id).await?;

        if !access.capabilities.allows(required) {
            return Err(AppError::Forbidden(format!(
                "Esta ação exige a permissão '{}'.",
                required.slug()
            )));
        }

        Ok(access)
    }

    // Equipe da plataforma (revisão de pagamentos, varredura manual,
    // trilha de auditoria). Independe de contexto de restaurante.
    pub async fn is_system_operator(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.membership_repo.user_has_system_role(user_id).await
    }

    pub async fn require_system_role(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.is_system_operator(user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Esta ação é restrita à equipe da plataforma.".into(),
            ))
        }
    }
}
