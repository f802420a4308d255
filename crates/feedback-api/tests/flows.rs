//! End-to-end request flows against the full router and an in-memory
//! database. Each client keeps its own cookies, like a browser would.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use feedback_api::auth::{AppState, AppStateInner};
use feedback_api::session::{SESSION_COOKIE, SessionConfig};
use feedback_db::Database;

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            session: SessionConfig {
                secret: "integration-test-secret".into(),
                ttl_hours: 1,
                cookie_secure: false,
            },
        });
        let router = feedback_api::router(state.clone());
        Self { state, router }
    }

    fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookies: HashMap::new(),
        }
    }

    fn feedback_ids(&self, username: &str) -> Vec<i64> {
        self.state
            .db
            .get_feedback_for_user(username)
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect()
    }
}

struct Client {
    router: Router,
    cookies: HashMap<String, String>,
}

impl Client {
    async fn get(&mut self, path: &str) -> Response {
        let req = Request::get(path).body(Body::empty()).unwrap();
        self.send(req).await
    }

    async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Response {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let req = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn send(&mut self, mut req: Request<Body>) -> Response {
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let resp = self.router.clone().oneshot(req).await.unwrap();

        for value in resp.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, val) = pair.split_once('=').unwrap();
            if val.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), val.to_string());
            }
        }
        resp
    }

    async fn register(&mut self, username: &str, email: &str) -> Response {
        self.post(
            "/register",
            &[
                ("username", username),
                ("password", "pw123"),
                ("confirm", "pw123"),
                ("email", email),
                ("first_name", "Alice"),
                ("last_name", "A"),
            ],
        )
        .await
    }

    fn logged_in(&self) -> bool {
        self.cookies.contains_key(SESSION_COOKIE)
    }
}

fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
}

async fn text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn root_redirects_to_register() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/").await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/register");

    let resp = client.get("/register").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("name=\"confirm\""));
}

#[tokio::test]
async fn register_view_profile_then_logout() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.register("alice", "a@x.com").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/alice");
    assert!(client.logged_in());

    let resp = client.get("/users/alice").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = text(resp).await;
    assert!(page.contains("Alice A"));
    assert!(page.contains("Welcome to the Feedback app!"));

    // Notice is shown once.
    let page = text(client.get("/users/alice").await).await;
    assert!(!page.contains("Welcome to the Feedback app!"));

    let resp = client.get("/logout").await;
    assert_eq!(location(&resp), "/");
    assert!(!client.logged_in());

    let resp = client.get("/users/alice").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let page = text(client.get("/login").await).await;
    assert!(page.contains("You must be logged in to view page."));
}

#[tokio::test]
async fn login_with_correct_and_wrong_password() {
    let app = TestApp::new();
    app.client().register("alice", "a@x.com").await;

    let mut client = app.client();
    let resp = client
        .post("/login", &[("username", "alice"), ("password", "wrong")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("Invalid username/password"));
    assert!(!client.logged_in());

    let resp = client
        .post("/login", &[("username", "nobody"), ("password", "pw123")])
        .await;
    assert!(text(resp).await.contains("Invalid username/password"));

    let resp = client
        .post("/login", &[("username", "alice"), ("password", "pw123")])
        .await;
    assert_eq!(location(&resp), "/users/alice");
    assert!(client.logged_in());

    let page = text(client.get("/users/alice").await).await;
    assert!(page.contains("Welcome, Alice"));
}

#[tokio::test]
async fn login_form_reports_missing_fields() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.post("/login", &[("username", "alice")]).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("Please enter your password"));
}

#[tokio::test]
async fn duplicate_registration_rerenders_form() {
    let app = TestApp::new();
    app.client().register("alice", "a@x.com").await;

    let mut client = app.client();
    let resp = client.register("alice", "new@x.com").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("Username is already taken"));
    assert!(!client.logged_in());

    let resp = client.register("alice2", "a@x.com").await;
    assert!(text(resp).await.contains("Email is already registered"));
}

#[tokio::test]
async fn owner_adds_feedback_and_sees_it_listed() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;

    let resp = alice.get("/users/alice/feedback/add").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = alice
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/alice");

    let rows = app.state.db.get_feedback_for_user("alice").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "alice");
    assert_eq!(rows[0].title, "Hi");

    let page = text(alice.get("/users/alice").await).await;
    assert!(page.contains("Hi"));
    assert!(page.contains("Hello"));
}

#[tokio::test]
async fn invalid_feedback_rerenders_form() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;

    let long_title = "t".repeat(101);
    let resp = alice
        .post("/users/alice/feedback/add", &[("title", long_title.as_str()), ("content", "")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = text(resp).await;
    assert!(page.contains("Title must be 100 characters or less"));
    assert!(page.contains("Please enter content"));
    assert!(app.feedback_ids("alice").is_empty());
}

#[tokio::test]
async fn adding_feedback_for_another_user_is_refused() {
    let app = TestApp::new();
    app.client().register("alice", "a@x.com").await;
    let mut bob = app.client();
    bob.register("bob", "b@x.com").await;

    let resp = bob.get("/users/alice/feedback/add").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/alice");

    let resp = bob
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/alice");
    assert!(app.feedback_ids("alice").is_empty());
    assert!(app.feedback_ids("bob").is_empty());

    let page = text(bob.get("/users/alice").await).await;
    assert!(page.contains("You have to be signed in to add new feedback."));

    let mut anonymous = app.client();
    let resp = anonymous.get("/users/alice/feedback/add").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = anonymous
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    assert_eq!(location(&resp), "/login");
    assert!(app.feedback_ids("alice").is_empty());
}

#[tokio::test]
async fn owner_edits_and_deletes_feedback() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;
    alice
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    let id = app.feedback_ids("alice")[0];

    let page = text(alice.get(&format!("/feedback/{}/update", id)).await).await;
    assert!(page.contains("value=\"Hi\""));

    let resp = alice
        .post(
            &format!("/feedback/{}/update", id),
            &[("title", "Hey"), ("content", "Changed")],
        )
        .await;
    assert_eq!(location(&resp), "/users/alice");
    let row = app.state.db.get_feedback(id).unwrap().unwrap();
    assert_eq!(row.title, "Hey");
    assert_eq!(row.content, "Changed");

    let resp = alice.post(&format!("/feedback/{}/delete", id), &[]).await;
    assert_eq!(location(&resp), "/users/alice");
    assert!(app.state.db.get_feedback(id).unwrap().is_none());
}

#[tokio::test]
async fn changing_another_users_feedback_is_refused() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;
    alice
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    let id = app.feedback_ids("alice")[0];

    let mut bob = app.client();
    bob.register("bob", "b@x.com").await;

    let resp = bob
        .post(
            &format!("/feedback/{}/update", id),
            &[("title", "Pwned"), ("content", "x")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/alice");

    let resp = bob.get(&format!("/feedback/{}/delete", id)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let row = app.state.db.get_feedback(id).unwrap().unwrap();
    assert_eq!(row.title, "Hi");
}

#[tokio::test]
async fn unknown_feedback_is_not_found() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;

    let resp = alice
        .post("/feedback/999/update", &[("title", "Hey"), ("content", "x")])
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(alice.get("/feedback/999/update").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/feedback/999/delete").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.post("/feedback/999/delete", &[]).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/feedback/abc/delete").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;

    assert_eq!(alice.get("/users/ghost").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/no/such/page").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_account_cascades_and_ends_session() {
    let app = TestApp::new();
    let mut alice = app.client();
    alice.register("alice", "a@x.com").await;
    for title in ["One", "Two"] {
        alice
            .post("/users/alice/feedback/add", &[("title", title), ("content", "c")])
            .await;
    }
    let ids = app.feedback_ids("alice");
    assert_eq!(ids.len(), 2);

    let mut bob = app.client();
    bob.register("bob", "b@x.com").await;
    let resp = bob.post("/users/alice/delete", &[]).await;
    assert_eq!(location(&resp), "/users/alice");
    assert!(app.state.db.get_user_by_username("alice").unwrap().is_some());

    let resp = alice.post("/users/alice/delete", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert!(!alice.logged_in());

    assert!(app.state.db.get_user_by_username("alice").unwrap().is_none());
    for id in ids {
        assert!(app.state.db.get_feedback(id).unwrap().is_none());
    }

    let resp = alice.get("/users/alice").await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn deleted_account_sessions_do_not_carry_over_to_a_new_owner() {
    let app = TestApp::new();
    let mut laptop = app.client();
    laptop.register("alice", "a@x.com").await;

    let mut phone = app.client();
    phone
        .post("/login", &[("username", "alice"), ("password", "pw123")])
        .await;
    assert!(phone.logged_in());

    laptop.post("/users/alice/delete", &[]).await;

    // The phone still holds its cookie, but the account behind it is gone.
    assert!(phone.logged_in());
    let resp = phone.get("/users/alice").await;
    assert_eq!(location(&resp), "/login");

    let mut newcomer = app.client();
    newcomer.register("alice", "new@x.com").await;
    assert!(newcomer.logged_in());

    let resp = phone.get("/users/alice").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let resp = phone
        .post("/users/alice/feedback/add", &[("title", "Hi"), ("content", "Hello")])
        .await;
    assert_eq!(location(&resp), "/login");
    assert!(app.feedback_ids("alice").is_empty());

    assert_eq!(newcomer.get("/users/alice").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn whitespace_password_is_accepted_verbatim() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client
        .post(
            "/register",
            &[
                ("username", "alice"),
                ("password", "   "),
                ("confirm", "   "),
                ("email", "a@x.com"),
                ("first_name", "Alice"),
                ("last_name", "A"),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/users/alice");
    client.get("/logout").await;

    let resp = client
        .post("/login", &[("username", "alice"), ("password", " ")])
        .await;
    assert!(text(resp).await.contains("Invalid username/password"));

    let resp = client
        .post("/login", &[("username", "alice"), ("password", "   ")])
        .await;
    assert_eq!(location(&resp), "/users/alice");
    assert!(client.logged_in());
}

#[tokio::test]
async fn logout_without_session_is_harmless() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/logout").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() {
    let app = TestApp::new();
    app.client().register("alice", "a@x.com").await;

    let mut mallory = app.client();
    mallory
        .cookies
        .insert(SESSION_COOKIE.to_string(), "not.a.jwt".to_string());

    let resp = mallory.get("/users/alice").await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let resp = app.client().get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(resp).await, "ok");
}
