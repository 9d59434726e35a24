use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::info;

use crate::config::AppConfig;
use crate::entity::user;
use crate::utils::hash;

/// Ensure the configured bootstrap administrator exists. Registration
/// only ever creates members, so this is the path by which the first
/// admin account comes to exist. Idempotent: an existing account with
/// the same email is left untouched.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let Some(admin) = &config.auth.bootstrap_admin else {
        return Ok(());
    };

    let password = hash::hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("bootstrap admin password hash error: {e}"))?;

    let model = user::ActiveModel {
        email: Set(admin.email.trim().to_lowercase()),
        name: Set(admin.name.clone()),
        password: Set(password),
        role: Set(user::ROLE_ADMIN.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!(email = %admin.email, "bootstrap admin ensured"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
