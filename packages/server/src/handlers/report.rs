//! Cross-user aggregation reporting.
//!
//! Reads the workout collection directly rather than going through the
//! per-record handlers: the report needs a group/join/project pipeline,
//! not a filtered read.

use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{user, workout};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::report::{ReportUser, ReportWorkout, UserWorkoutGroup};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/workouts/admin/all",
    tag = "Reports",
    operation_id = "adminWorkoutReport",
    summary = "Per-user workout report (admin only)",
    description = "Groups every workout by owner: point totals plus a projection of each workout \
        (certificate payloads omitted), joined with the owner's name and email. Groups are \
        ordered by ascending owner ID; users with no workouts do not appear. All-or-nothing: \
        any pipeline failure returns AGGREGATION_FAILURE.",
    responses(
        (status = 200, description = "Report groups", body = Vec<UserWorkoutGroup>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 500, description = "Pipeline failure (AGGREGATION_FAILURE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn admin_workout_report(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWorkoutGroup>>, AppError> {
    auth_user.require_admin()?;

    let groups = build_report(&state.db).await?;
    Ok(Json(groups))
}

/// Run the aggregation pipeline: group-by-owner totals, per-workout
/// projection, then a batched join against the user table.
pub(crate) async fn build_report<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<UserWorkoutGroup>, AppError> {
    // Stage 1: point totals per owner. Ascending owner ID fixes the
    // group order.
    let totals: Vec<(i32, Option<f64>)> = workout::Entity::find()
        .select_only()
        .column(workout::Column::OwnerId)
        .column_as(workout::Column::Points.sum(), "total_points")
        .group_by(workout::Column::OwnerId)
        .order_by_asc(workout::Column::OwnerId)
        .into_tuple()
        .all(db)
        .await
        .map_err(pipeline_failure)?;

    // Stage 2: projection of every workout, oldest first within a group.
    // Certificate columns are excluded; payloads never enter the report.
    let rows: Vec<(i32, String, f64, DateTime<Utc>)> = workout::Entity::find()
        .select_only()
        .column(workout::Column::OwnerId)
        .column(workout::Column::Title)
        .column(workout::Column::Points)
        .column(workout::Column::CreatedAt)
        .order_by_asc(workout::Column::CreatedAt)
        .into_tuple()
        .all(db)
        .await
        .map_err(pipeline_failure)?;

    let mut workouts_by_owner: HashMap<i32, Vec<ReportWorkout>> = HashMap::new();
    for (owner_id, title, points, created_at) in rows {
        workouts_by_owner.entry(owner_id).or_default().push(ReportWorkout {
            title,
            points,
            created_at,
        });
    }

    // Stage 3: join owner IDs against the user table.
    let owner_ids: Vec<i32> = totals.iter().map(|(owner_id, _)| *owner_id).collect();
    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(db)
        .await
        .map_err(pipeline_failure)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    // Stage 4: shape the output. Partial results are never returned; a
    // dangling owner reference fails the whole report.
    let mut groups = Vec::with_capacity(totals.len());
    for (owner_id, total_points) in totals {
        let user = users.get(&owner_id).ok_or_else(|| {
            AppError::Aggregation(format!("owner {owner_id} has no user record"))
        })?;
        groups.push(UserWorkoutGroup {
            owner_id,
            total_points: total_points.unwrap_or_default(),
            workouts: workouts_by_owner.remove(&owner_id).unwrap_or_default(),
            user: ReportUser {
                name: user.name.clone(),
                email: user.email.clone(),
            },
        });
    }

    Ok(groups)
}

fn pipeline_failure(err: DbErr) -> AppError {
    AppError::Aggregation(err.to_string())
}
