use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role granted to every self-registered account.
pub const ROLE_MEMBER: &str = "member";

/// Role allowed to read the cross-user aggregation report.
pub const ROLE_ADMIN: &str = "admin";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    /// Display name shown in listings and reports.
    pub name: String,

    /// Argon2 hash, never the plaintext.
    #[serde(skip_serializing)]
    pub password: String,

    pub role: String,

    #[sea_orm(has_many)]
    pub workouts: HasMany<super::workout::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
