use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/workouts", workout_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn workout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::workout::list_workouts).post(handlers::workout::create_workout),
        )
        .route("/admin/all", get(handlers::report::admin_workout_report))
        .route(
            "/{id}",
            get(handlers::workout::get_workout)
                .patch(handlers::workout::update_workout)
                .delete(handlers::workout::delete_workout),
        )
        .route(
            "/{id}/certificate",
            get(handlers::workout::download_certificate),
        )
        .layer(handlers::workout::certificate_upload_body_limit())
}
