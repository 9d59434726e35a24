use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workout")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    /// Point value. Any finite number is accepted, including non-positive.
    pub points: f64,

    /// Owning user. Immutable after creation.
    pub owner_id: i32,

    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    /// MIME type of the attached certificate. Always set when a
    /// certificate is present.
    pub certificate_content_type: Option<String>,

    /// Embedded-mode payload. Mutually exclusive with `certificate_path`.
    pub certificate_data: Option<Vec<u8>>,

    /// Referenced-mode storage key (content-hash hex in the byte store).
    /// Mutually exclusive with `certificate_data`.
    pub certificate_path: Option<String>,

    /// Original upload filename.
    pub certificate_filename: Option<String>,

    /// Certificate size in bytes.
    pub certificate_size: Option<i64>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
