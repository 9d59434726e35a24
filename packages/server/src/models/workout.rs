use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::attachment::{self, Certificate};
use crate::entity::{user, workout};
use crate::error::AppError;

/// Certificate metadata as exposed over the API. The payload itself is
/// only served by the dedicated download route.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CertificateInfo {
    #[schema(example = "application/pdf")]
    pub content_type: String,
    #[schema(example = "5k-finisher.pdf")]
    pub filename: Option<String>,
    #[schema(example = 142857)]
    pub size_bytes: Option<i64>,
    /// Storage mode: `embedded` or `referenced`.
    #[schema(example = "referenced")]
    pub storage: String,
}

impl From<&Certificate> for CertificateInfo {
    fn from(cert: &Certificate) -> Self {
        let storage = cert.storage_label().to_string();
        match cert {
            Certificate::Embedded { data, content_type } => Self {
                content_type: content_type.clone(),
                filename: None,
                size_bytes: Some(data.len() as i64),
                storage,
            },
            Certificate::Referenced {
                content_type,
                filename,
                size,
                ..
            } => Self {
                content_type: content_type.clone(),
                filename: filename.clone(),
                size_bytes: Some(*size),
                storage,
            },
        }
    }
}

/// Response DTO for a single workout.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkoutResponse {
    /// Workout ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "Morning 5k")]
    pub title: String,
    #[schema(example = 25.0)]
    pub points: f64,
    #[schema(example = 42)]
    pub owner_id: i32,
    pub certificate: Option<CertificateInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<workout::Model> for WorkoutResponse {
    fn from(model: workout::Model) -> Self {
        let certificate = attachment::certificate_of(&model)
            .as_ref()
            .map(CertificateInfo::from);
        Self {
            id: model.id.to_string(),
            title: model.title,
            points: model.points,
            owner_id: model.owner_id,
            certificate,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Owning user, joined into list entries.
#[derive(Serialize, utoipa::ToSchema)]
pub struct OwnerInfo {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Alice Wonder")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
}

impl From<&user::Model> for OwnerInfo {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A workout in the list view, enriched with its owner.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkoutListItem {
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "Morning 5k")]
    pub title: String,
    #[schema(example = 25.0)]
    pub points: f64,
    #[schema(example = 42)]
    pub owner_id: i32,
    pub certificate: Option<CertificateInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerInfo,
}

impl WorkoutListItem {
    pub fn new(model: workout::Model, owner: OwnerInfo) -> Self {
        let base = WorkoutResponse::from(model);
        Self {
            id: base.id,
            title: base.title,
            points: base.points,
            owner_id: base.owner_id,
            certificate: base.certificate,
            created_at: base.created_at,
            updated_at: base.updated_at,
            owner,
        }
    }
}

/// Response DTO for listing workouts.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkoutListResponse {
    pub workouts: Vec<WorkoutListItem>,
    pub total: u64,
}

/// Validate a trimmed title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Parse the `points` form field. Any finite number is accepted,
/// including non-positive values.
pub fn parse_points(raw: &str) -> Result<f64, AppError> {
    let points: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("Points must be a number".into()))?;
    if !points.is_finite() {
        return Err(AppError::Validation("Points must be a finite number".into()));
    }
    Ok(points)
}
