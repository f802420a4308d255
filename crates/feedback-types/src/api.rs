use serde::{Deserialize, Serialize};

// -- Session claims --

/// Claims carried by the signed session cookie. `sub` is the username of the
/// logged-in account; `nonce` must match the account's stored session nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub nonce: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// -- Feedback --

/// Shared by the "new feedback" and "edit feedback" forms.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}
