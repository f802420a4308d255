//! Pure form validation. Each `validate` returns every problem found so the
//! form can be re-rendered with all messages at once.

use crate::api::{FeedbackForm, LoginForm, RegisterForm};

pub const USERNAME_MAX: usize = 20;
pub const EMAIL_MAX: usize = 50;
pub const NAME_MAX: usize = 30;
pub const TITLE_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Messages attached to `field`, in the order they were reported.
pub fn messages_for<'a>(errors: &'a [FieldError], field: &str) -> impl Iterator<Item = &'a str> {
    errors
        .iter()
        .filter(move |e| e.field == field)
        .map(|e| e.message.as_str())
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Required check first; the length check only runs on present values.
    fn text(&mut self, field: &'static str, value: &str, required: &str, max: Option<(usize, &str)>) {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, required));
            return;
        }
        if let Some((max, message)) = max {
            if value.chars().count() > max {
                self.errors.push(FieldError::new(field, message));
            }
        }
    }

    /// Passwords are taken verbatim, so only a truly empty value is missing.
    fn password(&mut self, value: &str, required: &str) {
        if value.is_empty() {
            self.errors.push(FieldError::new("password", required));
        }
    }

    fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}

impl RegisterForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut c = Checker::new();
        c.text(
            "username",
            &self.username,
            "Please enter a unique username",
            Some((USERNAME_MAX, "Username must be 20 characters or less")),
        );
        // Usernames appear verbatim in URLs.
        if !self.username.chars().all(is_username_char) {
            c.errors.push(FieldError::new(
                "username",
                "Username may only contain letters, numbers, '.', '-' and '_'",
            ));
        }
        c.password(&self.password, "Please enter a password");
        if !self.password.is_empty() && self.password != self.confirm {
            c.errors.push(FieldError::new("password", "Passwords must match"));
        }
        c.text(
            "email",
            &self.email,
            "Please enter an email address",
            Some((EMAIL_MAX, "Email must be 50 characters or less")),
        );
        c.text(
            "first_name",
            &self.first_name,
            "Please enter your first name",
            Some((NAME_MAX, "First name must be 30 characters or less")),
        );
        c.text(
            "last_name",
            &self.last_name,
            "Please enter your last name",
            Some((NAME_MAX, "Last name must be 30 characters or less")),
        );
        c.finish()
    }
}

impl LoginForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut c = Checker::new();
        c.text(
            "username",
            &self.username,
            "Please enter your username",
            Some((USERNAME_MAX, "Username must be 20 characters or less")),
        );
        c.password(&self.password, "Please enter your password");
        c.finish()
    }
}

impl FeedbackForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut c = Checker::new();
        c.text(
            "title",
            &self.title,
            "Please enter a title",
            Some((TITLE_MAX, "Title must be 100 characters or less")),
        );
        c.text("content", &self.content, "Please enter content", None);
        c.finish()
    }
}
