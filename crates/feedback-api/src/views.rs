//! Server-rendered HTML. Deliberately plain: one layout and a handful of
//! forms, built with `format!` and escaped by hand.

use std::fmt::Write as _;

use axum::response::Html;

use feedback_types::api::{FeedbackForm, LoginForm, RegisterForm};
use feedback_types::models::{Feedback, User};
use feedback_types::validation::{FieldError, messages_for};

use crate::session::Session;

/// Per-page context shared by every view.
pub struct Chrome<'a> {
    pub viewer: Option<&'a str>,
    pub notice: Option<&'a str>,
}

impl<'a> Chrome<'a> {
    pub fn new(session: &'a Session, notice: Option<&'a str>) -> Self {
        Self {
            viewer: session.username(),
            notice,
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(chrome: &Chrome<'_>, title: &str, body: &str) -> Html<String> {
    let nav = match chrome.viewer {
        Some(username) => format!(
            r#"<a href="/users/{u}">{u}</a> | <a href="/logout">Log out</a>"#,
            u = escape(username)
        ),
        None => r#"<a href="/register">Register</a> | <a href="/login">Log in</a>"#.to_string(),
    };
    let notice = chrome
        .notice
        .map(|n| format!(r#"<p class="flash">{}</p>"#, escape(n)))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title} | Feedback</title></head>\n\
         <body>\n<nav>{nav}</nav>\n{notice}\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    ))
}

fn field(out: &mut String, errors: &[FieldError], name: &str, label: &str, kind: &str, value: &str) {
    let _ = write!(
        out,
        r#"<p><label for="{name}">{label}</label> <input id="{name}" name="{name}" type="{kind}" value="{value}">"#,
        value = escape(value),
    );
    for message in messages_for(errors, name) {
        let _ = write!(out, r#" <span class="error">{}</span>"#, escape(message));
    }
    out.push_str("</p>\n");
}

fn textarea(out: &mut String, errors: &[FieldError], name: &str, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<p><label for="{name}">{label}</label> <textarea id="{name}" name="{name}">{value}</textarea>"#,
        value = escape(value),
    );
    for message in messages_for(errors, name) {
        let _ = write!(out, r#" <span class="error">{}</span>"#, escape(message));
    }
    out.push_str("</p>\n");
}

// Passwords are never echoed back into a re-rendered form.

pub fn register_page(chrome: &Chrome<'_>, form: &RegisterForm, errors: &[FieldError]) -> Html<String> {
    let mut body = String::from("<form method=\"post\" action=\"/register\">\n");
    field(&mut body, errors, "username", "Username", "text", &form.username);
    field(&mut body, errors, "password", "Password", "password", "");
    field(&mut body, errors, "confirm", "Confirm Password", "password", "");
    field(&mut body, errors, "email", "Email Address", "email", &form.email);
    field(&mut body, errors, "first_name", "First Name", "text", &form.first_name);
    field(&mut body, errors, "last_name", "Last Name", "text", &form.last_name);
    body.push_str("<button>Register</button>\n</form>");
    layout(chrome, "Register", &body)
}

pub fn login_page(chrome: &Chrome<'_>, form: &LoginForm, errors: &[FieldError]) -> Html<String> {
    let mut body = String::from("<form method=\"post\" action=\"/login\">\n");
    field(&mut body, errors, "username", "Username", "text", &form.username);
    field(&mut body, errors, "password", "Password", "password", "");
    body.push_str("<button>Log in</button>\n</form>");
    layout(chrome, "Log in", &body)
}

pub fn profile_page(chrome: &Chrome<'_>, user: &User, feedback: &[Feedback]) -> Html<String> {
    let is_owner = chrome.viewer == Some(user.username.as_str());
    let username = escape(&user.username);

    let mut body = format!(
        "<p>{name} &lt;{email}&gt;</p>\n<h2>Feedback</h2>\n",
        name = escape(&user.full_name()),
        email = escape(&user.email),
    );

    if feedback.is_empty() {
        body.push_str("<p>No feedback yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for fb in feedback {
            let _ = write!(
                body,
                "<li><b>{title}</b> <small>{when}</small><p>{content}</p>",
                title = escape(&fb.title),
                when = fb.created_at.format("%Y-%m-%d %H:%M"),
                content = escape(&fb.content),
            );
            if is_owner {
                let _ = write!(
                    body,
                    r#"<a href="/feedback/{id}/update">Edit</a> <form method="post" action="/feedback/{id}/delete"><button>Delete</button></form>"#,
                    id = fb.id,
                );
            }
            body.push_str("</li>\n");
        }
        body.push_str("</ul>\n");
    }

    if is_owner {
        let _ = write!(
            body,
            "<p><a href=\"/users/{username}/feedback/add\">Add feedback</a></p>\n\
             <form method=\"post\" action=\"/users/{username}/delete\"><button>Delete account</button></form>"
        );
    }

    layout(chrome, &user.username, &body)
}

/// Shared by "add" and "edit"; `action` is the form's POST target.
pub fn feedback_page(
    chrome: &Chrome<'_>,
    heading: &str,
    action: &str,
    form: &FeedbackForm,
    errors: &[FieldError],
) -> Html<String> {
    let mut body = format!("<form method=\"post\" action=\"{}\">\n", escape(action));
    field(&mut body, errors, "title", "Title", "text", &form.title);
    textarea(&mut body, errors, "content", "Content", &form.content);
    body.push_str("<button>Save</button>\n</form>");
    layout(chrome, heading, &body)
}

pub fn not_found_page() -> Html<String> {
    let chrome = Chrome {
        viewer: None,
        notice: None,
    };
    layout(&chrome, "Not Found", "<p>Nothing here.</p>")
}

pub fn validation_page(errors: &[FieldError]) -> Html<String> {
    let chrome = Chrome {
        viewer: None,
        notice: None,
    };
    let mut body = String::from("<ul>\n");
    for e in errors {
        let _ = writeln!(body, "<li>{}: {}</li>", e.field, escape(&e.message));
    }
    body.push_str("</ul>");
    layout(&chrome, "Invalid input", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b a="1">&'"#), "&lt;b a=&quot;1&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn owner_sees_edit_controls() {
        let user = User {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
        };
        let feedback = vec![Feedback {
            id: 7,
            title: "Hi <there>".into(),
            content: "Hello".into(),
            username: "alice".into(),
            created_at: chrono::Utc::now(),
        }];

        let owner = Chrome {
            viewer: Some("alice"),
            notice: None,
        };
        let Html(page) = profile_page(&owner, &user, &feedback);
        assert!(page.contains("Hi &lt;there&gt;"));
        assert!(page.contains("/feedback/7/update"));
        assert!(page.contains("/users/alice/delete"));

        let visitor = Chrome {
            viewer: Some("bob"),
            notice: None,
        };
        let Html(page) = profile_page(&visitor, &user, &feedback);
        assert!(page.contains("Hi &lt;there&gt;"));
        assert!(!page.contains("/feedback/7/update"));
    }

    #[test]
    fn register_page_never_echoes_password() {
        let form = RegisterForm {
            username: "alice".into(),
            password: "s3cret".into(),
            confirm: "s3cret".into(),
            ..RegisterForm::default()
        };
        let chrome = Chrome {
            viewer: None,
            notice: Some("hello"),
        };
        let Html(page) = register_page(&chrome, &form, &[FieldError::new("email", "Please enter an email address")]);
        assert!(!page.contains("s3cret"));
        assert!(page.contains("value=\"alice\""));
        assert!(page.contains("Please enter an email address"));
        assert!(page.contains("hello"));
    }
}
