use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use feedback_types::models::{Feedback, User};

use crate::auth::{AppState, run_blocking};
use crate::error::AppError;
use crate::flash;
use crate::session::{self, Session};
use crate::views::{self, Chrome};

/// Look up a user, 404 if unknown.
pub(crate) async fn find_user(state: &AppState, username: &str) -> Result<User, AppError> {
    let username = username.to_string();
    run_blocking(state, move |db| db.get_user_by_username(&username))
        .await?
        .map(User::from)
        .ok_or(AppError::NotFound)
}

/// GET /users/{username} — profile and feedback list. Any logged-in user may
/// view any profile; edit controls only render for the owner.
pub async fn show_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    session: Session,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    session.require_login()?;

    let user = find_user(&state, &username).await?;
    let owner = user.username.clone();
    let feedback: Vec<Feedback> = run_blocking(&state, move |db| db.get_feedback_for_user(&owner))
        .await?
        .into_iter()
        .map(Feedback::from)
        .collect();

    let (jar, notice) = flash::take(jar);
    let chrome = Chrome::new(&session, notice.as_deref());
    Ok((jar, views::profile_page(&chrome, &user, &feedback)))
}

/// POST /users/{username}/delete — remove the account (feedback cascades)
/// and end the session.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    session: Session,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    session.require_ownership(&username, "You can only delete your own account.")?;

    let target = username.clone();
    if !run_blocking(&state, move |db| db.delete_user(&target)).await? {
        return Err(AppError::NotFound);
    }
    info!("Deleted user {} and their feedback", username);

    let jar = session::logout(jar);
    let jar = flash::set(jar, "Your account has been deleted.");
    Ok((jar, Redirect::to("/login")))
}
