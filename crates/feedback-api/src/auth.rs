use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, info, warn};

use feedback_db::Database;
use feedback_types::api::{LoginForm, RegisterForm};
use feedback_types::validation::FieldError;

use crate::credentials;
use crate::error::AppError;
use crate::flash;
use crate::session::{self, Session, SessionConfig};
use crate::views::{self, Chrome};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session: SessionConfig,
}

/// Run blocking DB (and hashing) work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("blocking task failed: {}", e)
        })?
}

pub async fn register_form(session: Session, jar: CookieJar) -> impl IntoResponse {
    let (jar, notice) = flash::take(jar);
    let chrome = Chrome::new(&session, notice.as_deref());
    (jar, views::register_page(&chrome, &RegisterForm::default(), &[]))
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match credentials::register(&state, &form).await {
        Ok(account) => {
            let user = account.user;
            let jar = session::login(jar, &state.session, &user.username, &account.session_nonce)?;
            let jar = flash::set(jar, "New User created.  Welcome to the Feedback app!");
            Ok((jar, Redirect::to(&format!("/users/{}", user.username))).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let chrome = Chrome::new(&session, None);
            Ok(views::register_page(&chrome, &form, &errors).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn login_form(session: Session, jar: CookieJar) -> impl IntoResponse {
    let (jar, notice) = flash::take(jar);
    let chrome = Chrome::new(&session, notice.as_deref());
    (jar, views::login_page(&chrome, &LoginForm::default(), &[]))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let chrome = Chrome::new(&session, None);

    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(views::login_page(&chrome, &form, &errors).into_response());
    }

    match credentials::authenticate(&state, &form.username, &form.password).await? {
        Some(account) => {
            let user = account.user;
            info!("{} logged in", user.username);
            let jar = session::login(jar, &state.session, &user.username, &account.session_nonce)?;
            let jar = flash::set(jar, &format!("Welcome, {}", user.first_name));
            Ok((jar, Redirect::to(&format!("/users/{}", user.username))).into_response())
        }
        None => {
            warn!("Failed login attempt for {}", form.username);
            let errors = [FieldError::new("password", "Invalid username/password")];
            Ok(views::login_page(&chrome, &form, &errors).into_response())
        }
    }
}

/// Always succeeds, with or without an active session.
pub async fn logout(session: Session, jar: CookieJar) -> impl IntoResponse {
    if let Some(username) = session.username() {
        info!("{} logged out", username);
    }
    let jar = session::logout(jar);
    let jar = flash::set(jar, "You have successfully logged out.");
    (jar, Redirect::to("/"))
}
