//! Per-request session identity.
//!
//! The logged-in username travels in a signed JWT inside an HttpOnly cookie,
//! together with the account's session nonce. Every handler that cares
//! receives a [`Session`] extracted from the request and asks it for the
//! identity explicitly.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use feedback_types::api::Claims;

use crate::auth::{AppState, run_blocking};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "feedback_session";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    /// Mark the cookie `Secure`; only when served over HTTPS.
    pub cookie_secure: bool,
}

/// Identity of the client making the current request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    #[cfg(test)]
    pub(crate) fn anonymous() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Gate for anything that needs a logged-in user.
    pub fn require_login(&self) -> Result<&str, AppError> {
        self.username.as_deref().ok_or(AppError::LoginRequired)
    }

    /// Logged in *and* acting as `owner`. On mismatch the client is sent to
    /// the owner's profile with `notice` flashed.
    pub fn require_ownership(&self, owner: &str, notice: &'static str) -> Result<&str, AppError> {
        let username = self.require_login()?;
        if username != owner {
            warn!("{} attempted to act on resources owned by {}", username, owner);
            return Err(AppError::Forbidden {
                redirect_to: format!("/users/{}", owner),
                notice,
            });
        }
        Ok(username)
    }
}

/// A token only counts while its account exists with the same nonce, so
/// deleting an account ends every session it had, on every client.
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(claims) = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| verify_token(&state.session.secret, cookie.value()))
        else {
            return Ok(Self::default());
        };

        let username = claims.sub.clone();
        let stored = run_blocking(state, move |db| db.get_session_nonce(&username)).await?;
        if stored.as_deref() != Some(claims.nonce.as_str()) {
            debug!("Ignoring stale session token for {}", claims.sub);
            return Ok(Self::default());
        }

        Ok(Self {
            username: Some(claims.sub),
        })
    }
}

/// Attach a fresh session cookie for `username`, bound to the account's
/// current `nonce`.
pub fn login(
    jar: CookieJar,
    config: &SessionConfig,
    username: &str,
    nonce: &str,
) -> anyhow::Result<CookieJar> {
    let token = create_token(&config.secret, username, nonce, config.ttl_hours)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure);
    Ok(jar.add(cookie))
}

/// Clear the session cookie. Harmless when there is no session.
pub fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn create_token(secret: &str, username: &str, nonce: &str, ttl_hours: i64) -> anyhow::Result<String> {
    let expires = chrono::Duration::try_hours(ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| anyhow::anyhow!("Session TTL of {} hours is out of range", ttl_hours))?;

    let claims = Claims {
        sub: username.to_string(),
        nonce: nonce.to_string(),
        exp: expires.timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// `None` for tampered, expired, or otherwise unreadable tokens.
fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Ignoring invalid session token: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            secret: "test-secret".into(),
            ttl_hours: 1,
            cookie_secure: false,
        }
    }

    #[test]
    fn token_roundtrip() {
        let token = create_token("test-secret", "alice", "n1", 1).unwrap();
        let claims = verify_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.nonce, "n1");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("other-secret", "alice", "n1", 1).unwrap();
        assert!(verify_token("test-secret", &token).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token("test-secret", "alice", "n1", -2).unwrap();
        assert!(verify_token("test-secret", &token).is_none());
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let mut config = config();
        config.ttl_hours = 3_000_000_000_000;
        assert!(login(CookieJar::new(), &config, "alice", "n1").is_err());

        config.ttl_hours = i64::MAX;
        assert!(login(CookieJar::new(), &config, "alice", "n1").is_err());
    }

    #[test]
    fn login_sets_http_only_cookie() {
        let jar = login(CookieJar::new(), &config(), "alice", "n1").unwrap();
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn logout_is_idempotent() {
        let jar = logout(CookieJar::new());
        let jar = logout(jar);
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn anonymous_session_requires_login() {
        let session = Session::anonymous();
        assert!(matches!(session.require_login(), Err(AppError::LoginRequired)));
        assert!(matches!(
            session.require_ownership("alice", "no"),
            Err(AppError::LoginRequired)
        ));
    }

    #[test]
    fn ownership_mismatch_redirects_to_owner() {
        let session = Session::for_user("bob");
        match session.require_ownership("alice", "not yours") {
            Err(AppError::Forbidden { redirect_to, notice }) => {
                assert_eq!(redirect_to, "/users/alice");
                assert_eq!(notice, "not yours");
            }
            other => panic!("expected Forbidden, got {:?}", other),
        }
        assert_eq!(Session::for_user("alice").require_ownership("alice", "x").unwrap(), "alice");
    }
}
