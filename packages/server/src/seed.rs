use sea_orm::*;
use tracing::info;

use crate::config::AuthConfig;
use crate::entity::{role, role_permission, user};
use crate::utils::hash;

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "staff", "viewer"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "student:view"),
    ("admin", "student:create"),
    ("admin", "student:edit"),
    ("admin", "student:delete"),
    ("admin", "score:view"),
    ("admin", "score:create"),
    ("admin", "score:edit"),
    ("admin", "score:delete"),
    ("admin", "score:import"),
    ("admin", "score:export"),
    ("admin", "class:manage"),
    ("admin", "course:manage"),
    ("admin", "user:manage"),
    // Staff: day-to-day record keeping
    ("staff", "student:view"),
    ("staff", "student:create"),
    ("staff", "student:edit"),
    ("staff", "student:delete"),
    ("staff", "score:view"),
    ("staff", "score:create"),
    ("staff", "score:edit"),
    ("staff", "score:delete"),
    ("staff", "score:import"),
    ("staff", "score:export"),
    // Viewer
    ("viewer", "student:view"),
    ("viewer", "score:view"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Create the configured bootstrap admin if that username is not taken yet.
///
/// Without this there is no way to obtain a token holding `user:manage`.
pub async fn ensure_admin_user(db: &DatabaseConnection, auth: &AuthConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&auth.admin_username, &auth.admin_password) else {
        return Ok(());
    };

    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(());
    }

    let model = user::ActiveModel {
        username: Set(username.clone()),
        password: Set(hash::hash_password(password)?),
        role: Set("admin".to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await?;
    info!(%username, "Created bootstrap admin account");

    Ok(())
}
