pub mod auth;
pub mod credentials;
pub mod error;
pub mod feedback;
pub mod flash;
pub mod session;
pub mod users;
pub mod views;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::auth::AppState;
use crate::error::AppError;

/// The full application: every route, with request tracing.
pub fn router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/", get(|| async { Redirect::to("/register") }))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout));

    let user_routes = Router::new()
        .route("/users/{username}", get(users::show_user))
        .route("/users/{username}/delete", post(users::delete_user))
        .route(
            "/users/{username}/feedback/add",
            get(feedback::add_form).post(feedback::add),
        );

    let feedback_routes = Router::new()
        .route("/feedback/{id}/update", get(feedback::edit_form).post(feedback::edit))
        .route("/feedback/{id}/delete", get(feedback::remove).post(feedback::remove));

    Router::new()
        .merge(account_routes)
        .merge(user_routes)
        .merge(feedback_routes)
        .route("/health", get(|| async { "ok" }))
        .fallback(|| async { AppError::NotFound })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
