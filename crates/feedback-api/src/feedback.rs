//! Feedback lifecycle: create under the owner, edit and delete by the owner.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use feedback_types::api::FeedbackForm;
use feedback_types::models::Feedback;

use crate::auth::{AppState, run_blocking};
use crate::error::AppError;
use crate::flash;
use crate::session::Session;
use crate::users::find_user;
use crate::views::{self, Chrome};

const ADD_NOTICE: &str = "You have to be signed in to add new feedback.";
const CHANGE_NOTICE: &str = "You can only change your own feedback.";

// -- Store --

pub async fn get(state: &AppState, id: i64) -> Result<Feedback, AppError> {
    run_blocking(state, move |db| db.get_feedback(id))
        .await?
        .map(Feedback::from)
        .ok_or(AppError::NotFound)
}

pub async fn create(state: &AppState, owner: &str, form: &FeedbackForm) -> Result<Feedback, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (owner, title, content) = (owner.to_string(), form.title.clone(), form.content.clone());
    let row = run_blocking(state, move |db| {
        let id = db.insert_feedback(&owner, &title, &content)?;
        db.get_feedback(id)?
            .ok_or_else(|| anyhow::anyhow!("Feedback {} vanished after insert", id))
    })
    .await?;

    Ok(Feedback::from(row))
}

/// Overwrites title and content only.
pub async fn update(state: &AppState, id: i64, form: &FeedbackForm) -> Result<Feedback, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (title, content) = (form.title.clone(), form.content.clone());
    run_blocking(state, move |db| db.update_feedback(id, &title, &content))
        .await?
        .map(Feedback::from)
        .ok_or(AppError::NotFound)
}

pub async fn delete(state: &AppState, id: i64) -> Result<(), AppError> {
    if run_blocking(state, move |db| db.delete_feedback(id)).await? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

/// Non-numeric ids can never match a row.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Login, existence, then ownership: unknown ids are a 404 for any
/// logged-in user.
async fn owned_feedback(state: &AppState, session: &Session, raw_id: &str) -> Result<Feedback, AppError> {
    session.require_login()?;
    let feedback = get(state, parse_id(raw_id)?).await?;
    session.require_ownership(&feedback.username, CHANGE_NOTICE)?;
    Ok(feedback)
}

// -- Handlers --

/// GET /users/{username}/feedback/add
pub async fn add_form(
    State(state): State<AppState>,
    Path(username): Path<String>,
    session: Session,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    session.require_ownership(&username, ADD_NOTICE)?;
    find_user(&state, &username).await?;

    let (jar, notice) = flash::take(jar);
    let chrome = Chrome::new(&session, notice.as_deref());
    let action = format!("/users/{}/feedback/add", username);
    Ok((
        jar,
        views::feedback_page(&chrome, "New Feedback", &action, &FeedbackForm::default(), &[]),
    ))
}

/// POST /users/{username}/feedback/add
pub async fn add(
    State(state): State<AppState>,
    Path(username): Path<String>,
    session: Session,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    session.require_ownership(&username, ADD_NOTICE)?;
    find_user(&state, &username).await?;

    match create(&state, &username, &form).await {
        Ok(feedback) => {
            info!("{} added feedback {}", username, feedback.id);
            Ok(Redirect::to(&format!("/users/{}", username)).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let chrome = Chrome::new(&session, None);
            let action = format!("/users/{}/feedback/add", username);
            Ok(views::feedback_page(&chrome, "New Feedback", &action, &form, &errors).into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET /feedback/{id}/update
pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let feedback = owned_feedback(&state, &session, &id).await?;

    let (jar, notice) = flash::take(jar);
    let chrome = Chrome::new(&session, notice.as_deref());
    let action = format!("/feedback/{}/update", feedback.id);
    let form = FeedbackForm {
        title: feedback.title,
        content: feedback.content,
    };
    Ok((jar, views::feedback_page(&chrome, "Edit Feedback", &action, &form, &[])))
}

/// POST /feedback/{id}/update
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let feedback = owned_feedback(&state, &session, &id).await?;

    match update(&state, feedback.id, &form).await {
        Ok(updated) => {
            info!("{} updated feedback {}", updated.username, updated.id);
            Ok(Redirect::to(&format!("/users/{}", updated.username)).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let chrome = Chrome::new(&session, None);
            let action = format!("/feedback/{}/update", feedback.id);
            Ok(views::feedback_page(&chrome, "Edit Feedback", &action, &form, &errors).into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET or POST /feedback/{id}/delete
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let feedback = owned_feedback(&state, &session, &id).await?;

    delete(&state, feedback.id).await?;
    info!("{} deleted feedback {}", feedback.username, feedback.id);

    let jar = flash::set(jar, "Feedback deleted.");
    Ok((jar, Redirect::to(&format!("/users/{}", feedback.username))))
}
