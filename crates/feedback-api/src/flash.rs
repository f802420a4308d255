//! One-shot notices carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;

const FLASH_COOKIE: &str = "feedback_flash";

pub fn set(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, B64.encode(message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Read the pending notice, if any, and clear it so it is shown once.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let message = B64
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}
