use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use feedback_types::validation::FieldError;

use crate::{flash, views};

pub const LOGIN_REQUIRED_NOTICE: &str = "You must be logged in to view page.";

/// Every failure a request can end in. All of them are turned into a
/// response at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("invalid form input")]
    Validation(Vec<FieldError>),

    #[error("login required")]
    LoginRequired,

    /// Logged in, but not as the owner of the resource.
    #[error("forbidden: {notice}")]
    Forbidden {
        redirect_to: String,
        notice: &'static str,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, views::not_found_page()).into_response(),
            // Handlers re-render their own forms; this only fires for a
            // validation error that escaped one.
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, views::validation_page(&errors)).into_response()
            }
            AppError::LoginRequired => {
                let jar = flash::set(CookieJar::new(), LOGIN_REQUIRED_NOTICE);
                (jar, Redirect::to("/login")).into_response()
            }
            AppError::Forbidden {
                redirect_to,
                notice,
            } => {
                let jar = flash::set(CookieJar::new(), notice);
                (jar, Redirect::to(&redirect_to)).into_response()
            }
            AppError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
