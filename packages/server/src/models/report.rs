use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display data for the user a group belongs to.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportUser {
    #[schema(example = "Alice Wonder")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Projection of a single workout inside a report group. Certificate
/// payloads are deliberately omitted.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportWorkout {
    #[schema(example = "Morning 5k")]
    pub title: String,
    #[schema(example = 25.0)]
    pub points: f64,
    pub created_at: DateTime<Utc>,
}

/// One user's group in the admin report: the point total plus every
/// constituent workout, joined with display data.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserWorkoutGroup {
    #[schema(example = 42)]
    pub owner_id: i32,
    #[schema(example = 30.0)]
    pub total_points: f64,
    pub workouts: Vec<ReportWorkout>,
    pub user: ReportUser,
}
