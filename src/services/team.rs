// src/services/team.rs

use bcrypt::hash;
use serde_json::json;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, MembershipRepository, RoleRepository, UserRepository},
    models::{
        audit::{AuditAction, AuditEntry},
        rbac::{
            split_wildcard, CreateRolePayload, InviteMemberPayload, MemberView, Membership,
            Permission, Role, UpdateMemberPayload, UpdateRolePayload,
        },
    },
};

// Gestão de equipe: papéis do restaurante e vínculos de funcionários.
#[derive(Clone)]
pub struct TeamService {
    role_repo: RoleRepository,
    membership_repo: MembershipRepository,
    user_repo: UserRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl TeamService {
    pub fn new(
        role_repo: RoleRepository,
        membership_repo: MembershipRepository,
        user_repo: UserRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            role_repo,
            membership_repo,
            user_repo,
            audit_repo,
            pool,
        }
    }

    // ---
    // Papéis
    // ---

    pub async fn list_roles(&self, restaurant_id: Uuid) -> Result<Vec<Role>, AppError> {
        self.role_repo.list_for_restaurant(restaurant_id).await
    }

    pub async fn create_role(
        &self,
        restaurant_id: Uuid,
        created_by: Uuid,
        payload: &CreateRolePayload,
    ) -> Result<Role, AppError> {
        validate_permission_slugs(&payload.permissions)?;
        let (permissions, grants_all) = split_wildcard(&payload.permissions);

        let mut tx = self.pool.begin().await?;

        let role = self
            .role_repo
            .create(
                &mut *tx,
                restaurant_id,
                payload.name.trim(),
                payload.description.as_deref(),
                &permissions,
                grants_all,
            )
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(created_by),
                    action: AuditAction::RoleCreate,
                    target_model: "Role",
                    target_id: role.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        json!({ "name": role.name, "permissions": role.permissions }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(role)
    }

    pub async fn update_role(
        &self,
        restaurant_id: Uuid,
        updated_by: Uuid,
        role_id: Uuid,
        payload: &UpdateRolePayload,
    ) -> Result<Role, AppError> {
        let role = self.editable_role(restaurant_id, role_id).await?;

        let name = payload.name.as_deref().unwrap_or(&role.name).trim();
        let description = payload
            .description
            .as_deref()
            .or(role.description.as_deref());

        let (permissions, grants_all) = match &payload.permissions {
            Some(slugs) => {
                validate_permission_slugs(slugs)?;
                split_wildcard(slugs)
            }
            None => (role.permissions.clone(), role.grants_all),
        };

        let mut tx = self.pool.begin().await?;

        let updated = self
            .role_repo
            .update(&mut *tx, role.id, name, description, &permissions, grants_all)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(updated_by),
                    action: AuditAction::RoleUpdate,
                    target_model: "Role",
                    target_id: role.id,
                    changes: AuditEntry::changes(
                        json!({ "name": role.name, "permissions": role.permissions }),
                        json!({ "name": updated.name, "permissions": updated.permissions }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn delete_role(
        &self,
        restaurant_id: Uuid,
        deleted_by: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        let role = self.editable_role(restaurant_id, role_id).await?;

        if self.role_repo.count_memberships_using(role.id).await? > 0 {
            return Err(AppError::RoleInUse);
        }

        let mut tx = self.pool.begin().await?;

        self.role_repo.delete(&mut *tx, role.id).await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(deleted_by),
                    action: AuditAction::RoleDelete,
                    target_model: "Role",
                    target_id: role.id,
                    changes: AuditEntry::changes(json!({ "name": role.name }), serde_json::Value::Null),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    // Só papéis criados pelo próprio restaurante podem ser alterados.
    // Modelos globais (restaurant_id nulo) e papéis de sistema ficam
    // fora do alcance de qualquer restaurante.
    async fn editable_role(&self, restaurant_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        let role = self
            .role_repo
            .find_by_id(role_id)
            .await?
            .ok_or(AppError::NotFound("Papel"))?;

        if role.is_system || role.restaurant_id != Some(restaurant_id) {
            return Err(AppError::SystemRoleImmutable);
        }

        Ok(role)
    }

    // ---
    // Equipe
    // ---

    pub async fn list_members(&self, restaurant_id: Uuid) -> Result<Vec<MemberView>, AppError> {
        self.membership_repo.list_members(restaurant_id).await
    }

    // Convite: cria a conta do funcionário (se o e-mail for novo) e o
    // vínculo com o papel escolhido. E-mail já cadastrado em outro
    // restaurante ganha só o vínculo novo.
    pub async fn invite_member(
        &self,
        restaurant_id: Uuid,
        invited_by: Uuid,
        payload: &InviteMemberPayload,
    ) -> Result<Membership, AppError> {
        let role = self.assignable_role(restaurant_id, payload.role_id).await?;

        let password_clone = payload.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let existing = self.user_repo.find_by_email(&payload.email).await?;

        let mut tx = self.pool.begin().await?;

        let user = match existing {
            Some(user) => user,
            None => {
                self.user_repo
                    .create_user(&mut *tx, &payload.name, &payload.email, &password_hash, None)
                    .await?
            }
        };

        // Primeiro vínculo do usuário vira o contexto padrão.
        let is_default = self
            .membership_repo
            .find_default_for_user(user.id)
            .await?
            .is_none();

        let membership = self
            .membership_repo
            .create(&mut *tx, user.id, restaurant_id, role.id, is_default)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(invited_by),
                    action: AuditAction::MembershipCreate,
                    target_model: "Membership",
                    target_id: membership.id,
                    changes: AuditEntry::changes(
                        serde_json::Value::Null,
                        json!({ "userId": user.id, "roleId": role.id }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(membership)
    }

    pub async fn update_member(
        &self,
        restaurant_id: Uuid,
        updated_by: Uuid,
        membership_id: Uuid,
        payload: &UpdateMemberPayload,
    ) -> Result<Membership, AppError> {
        let membership = self.scoped_membership(restaurant_id, membership_id).await?;

        let role_id = match payload.role_id {
            Some(role_id) => self.assignable_role(restaurant_id, role_id).await?.id,
            None => membership.role_id,
        };
        let active = payload.active.unwrap_or(membership.active);
        let is_default = payload.is_default.unwrap_or(membership.is_default);

        let mut tx = self.pool.begin().await?;

        // Contexto padrão é único por usuário.
        if is_default && !membership.is_default {
            self.membership_repo
                .clear_default(&mut *tx, membership.user_id)
                .await?;
        }

        let updated = self
            .membership_repo
            .update(&mut *tx, membership.id, role_id, active, is_default)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(updated_by),
                    action: AuditAction::MembershipUpdate,
                    target_model: "Membership",
                    target_id: membership.id,
                    changes: AuditEntry::changes(
                        json!({ "roleId": membership.role_id, "active": membership.active }),
                        json!({ "roleId": updated.role_id, "active": updated.active }),
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn remove_member(
        &self,
        restaurant_id: Uuid,
        removed_by: Uuid,
        membership_id: Uuid,
    ) -> Result<(), AppError> {
        let membership = self.scoped_membership(restaurant_id, membership_id).await?;

        let mut tx = self.pool.begin().await?;

        self.membership_repo.delete(&mut *tx, membership.id).await?;

        self.audit_repo
            .append(
                &mut *tx,
                AuditEntry {
                    user_id: Some(removed_by),
                    action: AuditAction::MembershipDelete,
                    target_model: "Membership",
                    target_id: membership.id,
                    changes: AuditEntry::changes(
                        json!({ "userId": membership.user_id, "roleId": membership.role_id }),
                        serde_json::Value::Null,
                    ),
                    metadata: AuditEntry::request_metadata(None, None, Some(restaurant_id)),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    // Vínculo do caminho, limitado ao restaurante do contexto.
    async fn scoped_membership(
        &self,
        restaurant_id: Uuid,
        membership_id: Uuid,
    ) -> Result<Membership, AppError> {
        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or(AppError::NotFound("Vínculo"))?;

        if membership.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Vínculo"));
        }

        Ok(membership)
    }

    // Papéis atribuíveis: modelos globais sem flag de sistema, ou papéis
    // do próprio restaurante.
    async fn assignable_role(&self, restaurant_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        let role = self
            .role_repo
            .find_by_id(role_id)
            .await?
            .ok_or(AppError::NotFound("Papel"))?;

        if role.is_system {
            return Err(AppError::Forbidden(
                "Papéis de sistema não podem ser atribuídos pelo restaurante.".into(),
            ));
        }

        match role.restaurant_id {
            None => Ok(role),
            Some(owner) if owner == restaurant_id => Ok(role),
            Some(_) => Err(AppError::NotFound("Papel")),
        }
    }
}

fn validate_permission_slugs(slugs: &[String]) -> Result<(), AppError> {
    for slug in slugs {
        let trimmed = slug.trim().to_ascii_lowercase();
        if crate::models::rbac::WILDCARD_SLUGS.contains(&trimmed.as_str()) {
            continue;
        }
        if Permission::from_str(&trimmed).is_err() {
            return Err(AppError::InvalidInput(format!(
                "Permissão desconhecida: '{}'",
                slug
            )));
        }
    }

    Ok(())
}
