use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use common::storage::ContentHash;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::attachment::{self, Certificate, IncomingFile};
use crate::entity::{user, workout};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::workout::{
    OwnerInfo, WorkoutListItem, WorkoutListResponse, WorkoutResponse, parse_points, validate_title,
};
use crate::state::AppState;

pub fn certificate_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(16 * 1024 * 1024) // 16 MB
}

/// Decoded `multipart/form-data` payload shared by create and update.
#[derive(Default)]
struct WorkoutForm {
    title: Option<String>,
    points: Option<String>,
    certificate: Option<IncomingFile>,
}

/// Read the workout form fields out of a multipart request. Immutable
/// record fields are rejected outright rather than silently ignored;
/// other unknown fields are skipped.
async fn read_workout_form(multipart: &mut Multipart) -> Result<WorkoutForm, AppError> {
    let mut form = WorkoutForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read title: {e}")))?;
                form.title = Some(text);
            }
            Some("points") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read points: {e}")))?;
                form.points = Some(text);
            }
            Some("certificate") => {
                let filename = field.file_name().map(|s| s.to_string()).ok_or_else(|| {
                    AppError::Validation("Certificate field must have a filename".into())
                })?;
                let declared_content_type = field.content_type().map(|m| m.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        AppError::Validation(format!("Failed to read certificate: {e}"))
                    })?
                    .to_vec();
                form.certificate = Some(IncomingFile {
                    data,
                    filename,
                    declared_content_type,
                });
            }
            Some(name @ ("id" | "owner_id" | "user_id" | "created_at" | "updated_at")) => {
                return Err(AppError::Validation(format!(
                    "Field '{name}' is immutable"
                )));
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(form)
}

#[utoipa::path(
    post,
    path = "/api/v1/workouts",
    tag = "Workouts",
    operation_id = "createWorkout",
    summary = "Create a workout",
    description = "Creates a workout owned by the caller. Multipart fields: `title`, `points`, \
        and optionally a `certificate` file (pdf/jpg/jpeg/png). Missing required fields are \
        reported together in `empty_fields`.",
    request_body(content_type = "multipart/form-data", description = "title, points, optional certificate file"),
    responses(
        (status = 201, description = "Workout created", body = WorkoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR, INVALID_ATTACHMENT_FORMAT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(owner_id = auth_user.user_id))]
pub async fn create_workout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_workout_form(&mut multipart).await?;

    let mut empty_fields = Vec::new();
    if form.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        empty_fields.push("title".to_string());
    }
    if form.points.as_deref().is_none_or(|p| p.trim().is_empty()) {
        empty_fields.push("points".to_string());
    }
    if state.config.certificate.required && form.certificate.is_none() {
        empty_fields.push("certificate".to_string());
    }
    if !empty_fields.is_empty() {
        return Err(AppError::MissingFields(empty_fields));
    }

    let title = form.title.unwrap_or_default().trim().to_string();
    validate_title(&title)?;
    let points = parse_points(form.points.as_deref().unwrap_or_default())?;

    // Bytes are durably stored before the record commit; a failed commit
    // rolls the payload back below.
    let prepared = match form.certificate {
        Some(file) => Some(
            attachment::prepare(state.config.certificate.mode, &*state.blob_store, file).await?,
        ),
        None => None,
    };

    let now = Utc::now();
    let mut new_workout = workout::ActiveModel {
        id: Set(Uuid::now_v7()),
        title: Set(title),
        points: Set(points),
        owner_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    if let Some(prepared) = &prepared {
        attachment::apply(&mut new_workout, &prepared.certificate);
    }

    match new_workout.insert(&state.db).await {
        Ok(model) => Ok((StatusCode::CREATED, Json(WorkoutResponse::from(model)))),
        Err(e) => {
            if let Some(prepared) = &prepared {
                attachment::discard(&*state.blob_store, prepared).await;
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/workouts",
    tag = "Workouts",
    operation_id = "listWorkouts",
    summary = "List all workouts, newest first",
    description = "Returns every workout sorted by creation time descending, each enriched with \
        its owner's name and email. Listing is not scoped to the caller; mutation is.",
    responses(
        (status = 200, description = "Workout list", body = WorkoutListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_workouts(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<WorkoutListResponse>, AppError> {
    let workouts = workout::Entity::find()
        .order_by_desc(workout::Column::CreatedAt)
        .order_by_desc(workout::Column::Id)
        .all(&state.db)
        .await?;

    let mut owner_ids: Vec<i32> = workouts.iter().map(|w| w.owner_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();

    let owners: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let total = workouts.len() as u64;
    let mut items = Vec::with_capacity(workouts.len());
    for model in workouts {
        let owner = owners
            .get(&model.owner_id)
            .ok_or_else(|| AppError::Internal(format!("workout owner {} missing", model.owner_id)))?;
        let owner = OwnerInfo::from(owner);
        items.push(WorkoutListItem::new(model, owner));
    }

    Ok(Json(WorkoutListResponse {
        workouts: items,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/workouts/{id}",
    tag = "Workouts",
    operation_id = "getWorkout",
    summary = "Get a workout by ID",
    description = "Returns the workout with certificate metadata. The certificate payload is \
        served by the `/certificate` sub-route.",
    params(("id" = String, Path, description = "Workout ID (UUID)")),
    responses(
        (status = 200, description = "Workout details", body = WorkoutResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Workout not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id = %id))]
pub async fn get_workout(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkoutResponse>, AppError> {
    let model = find_workout(&state.db, &id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/workouts/{id}",
    tag = "Workouts",
    operation_id = "updateWorkout",
    summary = "Update a workout",
    description = "Partially updates a workout using PATCH semantics — only supplied multipart \
        fields change. A new `certificate` file replaces the previous one. `id`, `owner_id` and \
        `created_at` are immutable and rejected. Only the owner may update.",
    params(("id" = String, Path, description = "Workout ID (UUID)")),
    request_body(content_type = "multipart/form-data", description = "Any subset of title, points, certificate"),
    responses(
        (status = 200, description = "Workout updated", body = WorkoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR, INVALID_ATTACHMENT_FORMAT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller does not own the workout (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Workout not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id = %id))]
pub async fn update_workout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<WorkoutResponse>, AppError> {
    let form = read_workout_form(&mut multipart).await?;

    let existing = find_workout(&state.db, &id).await?;
    auth_user.require_owner(existing.owner_id)?;

    if form.title.is_none() && form.points.is_none() && form.certificate.is_none() {
        return Ok(Json(existing.into()));
    }

    let title = match &form.title {
        Some(raw) => {
            let title = raw.trim().to_string();
            validate_title(&title)?;
            Some(title)
        }
        None => None,
    };
    let points = match &form.points {
        Some(raw) => Some(parse_points(raw)?),
        None => None,
    };

    let prepared = match form.certificate {
        Some(file) => Some(
            attachment::prepare(state.config.certificate.mode, &*state.blob_store, file).await?,
        ),
        None => None,
    };

    let previous_path = existing.certificate_path.clone();
    let mut active: workout::ActiveModel = existing.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(points) = points {
        active.points = Set(points);
    }
    if let Some(prepared) = &prepared {
        attachment::apply(&mut active, &prepared.certificate);
    }
    active.updated_at = Set(Utc::now());

    match active.update(&state.db).await {
        Ok(model) => {
            // The replaced payload is released only once the record commit
            // succeeded; a reclamation failure leaks bytes but never the
            // record, so it is logged rather than surfaced.
            if prepared.is_some()
                && let Some(old_path) = previous_path
                && model.certificate_path.as_deref() != Some(old_path.as_str())
                && let Err(e) =
                    attachment::release(&state.db, &*state.blob_store, &old_path).await
            {
                tracing::warn!("failed to release replaced certificate {old_path}: {e:?}");
            }
            Ok(Json(model.into()))
        }
        Err(e) => {
            if let Some(prepared) = &prepared {
                attachment::discard(&*state.blob_store, prepared).await;
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/workouts/{id}",
    tag = "Workouts",
    operation_id = "deleteWorkout",
    summary = "Delete a workout",
    description = "Hard-deletes a workout. A referenced certificate payload is released from the \
        byte store once no other workout shares it. Only the owner may delete.",
    params(("id" = String, Path, description = "Workout ID (UUID)")),
    responses(
        (status = 204, description = "Workout deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Caller does not own the workout (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Workout not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id = %id))]
pub async fn delete_workout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_workout(&state.db, &id).await?;
    auth_user.require_owner(existing.owner_id)?;

    let certificate_path = existing.certificate_path.clone();
    workout::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    if let Some(path) = certificate_path
        && let Err(e) = attachment::release(&state.db, &*state.blob_store, &path).await
    {
        tracing::warn!("failed to release certificate {path} of deleted workout: {e:?}");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/workouts/{id}/certificate",
    tag = "Workouts",
    operation_id = "downloadCertificate",
    summary = "Download a workout's certificate",
    description = "Binary passthrough: returns the raw certificate bytes with the stored content \
        type. Referenced payloads are streamed and support ETag-based caching via If-None-Match.",
    params(("id" = String, Path, description = "Workout ID (UUID)")),
    responses(
        (status = 200, description = "Certificate content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Workout or certificate not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, headers), fields(id = %id))]
pub async fn download_certificate(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let model = find_workout(&state.db, &id).await?;

    let certificate = attachment::certificate_of(&model)
        .ok_or_else(|| AppError::NotFound("Workout has no certificate".into()))?;

    match certificate {
        Certificate::Embedded { data, content_type } => {
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, data.len().to_string())
                .header(header::CONTENT_DISPOSITION, "inline")
                .body(Body::from(data))
                .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;
            Ok(response)
        }
        Certificate::Referenced {
            path,
            content_type,
            filename,
            size,
        } => {
            // The content hash doubles as a strong validator.
            let etag_value = format!("\"{path}\"");
            if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
                && let Ok(val) = if_none_match.to_str()
                && (val == etag_value || val == "*")
            {
                return Ok(StatusCode::NOT_MODIFIED.into_response());
            }

            let hash = ContentHash::from_hex(&path)?;
            let reader = state.blob_store.get_stream(&hash).await?;
            let body = Body::from_stream(ReaderStream::new(reader));

            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, size.to_string())
                .header(
                    header::CONTENT_DISPOSITION,
                    content_disposition_value(filename.as_deref()),
                )
                .header(header::ETAG, &etag_value)
                .header(header::CACHE_CONTROL, "private, max-age=3600")
                .body(body)
                .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;
            Ok(response)
        }
    }
}

/// Resolve a path segment to a workout. Malformed identifiers are
/// indistinguishable from missing records, per the API contract.
async fn find_workout<C: ConnectionTrait>(db: &C, id: &str) -> Result<workout::Model, AppError> {
    let uuid =
        Uuid::parse_str(id).map_err(|_| AppError::NotFound("No such workout".into()))?;
    workout::Entity::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("No such workout".into()))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: Option<&str>) -> String {
    let Some(filename) = filename else {
        return "inline".to_string();
    };
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    if ascii_safe.is_empty() {
        "inline".to_string()
    } else {
        format!("inline; filename=\"{ascii_safe}\"")
    }
}
