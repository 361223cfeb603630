use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;

use storefront_api::app::build_app;
use storefront_api::config::ApiConfig;
use storefront_api::dispatch::Services;
use storefront_auth::{InMemorySessionStore, SESSION_COOKIE, Session, SessionAuthenticator};
use storefront_infra::{LogMailer, MemoryDatabase, RowMap};

struct TestServer {
    base_url: String,
    db: Arc<MemoryDatabase>,
    sessions: Arc<InMemorySessionStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_config(ApiConfig::default()).await
    }

    async fn spawn_with_config(config: ApiConfig) -> Self {
        // Same app wiring as prod, but in-memory stores and an ephemeral
        // port.
        let db = Arc::new(MemoryDatabase::new());
        let sessions = Arc::new(InMemorySessionStore::new());

        let services = Arc::new(Services {
            db: db.clone(),
            authenticator: SessionAuthenticator::new(sessions.clone()),
            mailer: Arc::new(LogMailer),
            config,
        });

        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            db,
            sessions,
            handle,
        }
    }

    /// Seed a valid session directly in the store and return its cookie
    /// header value.
    fn seed_session(&self, user_id: i64) -> String {
        let token = format!("testtoken{user_id}");
        self.sessions.insert_raw(Session {
            token: token.clone(),
            user_id,
            expires_at: Utc::now() + Duration::days(1),
        });
        format!("{SESSION_COOKIE}={token}")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn user_row(id: i64, name: &str, email: &str, password_hash: &str) -> RowMap {
    [
        ("id".to_string(), json!(id)),
        ("name".to_string(), json!(name)),
        ("email".to_string(), json!(email)),
        ("password".to_string(), json!(password_hash)),
    ]
    .into_iter()
    .collect()
}

/// The session cookie value from a response's Set-Cookie header.
fn session_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn unmatched_routes_are_a_404_naming_the_path() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/no/such/route", srv.base_url))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["path"], "/no/such/route");
}

#[tokio::test]
async fn user_registration_returns_the_identity_without_the_password() {
    let srv = TestServer::spawn().await;
    srv.db.stub_exec("INSERT INTO users", 1, 7);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/user", srv.base_url))
        .json(&json!({ "name": "A", "email": "a@b.com", "password": "Abc123!@" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 7);
    assert_eq!(body["data"]["email"], "a@b.com");
    assert_eq!(body["data"]["name"], "A");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn repeating_an_email_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    srv.db.stub_rows(
        "SELECT * FROM users WHERE email",
        vec![user_row(7, "A", "a@b.com", "irrelevant")],
    );

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/user", srv.base_url))
        .json(&json!({ "name": "A", "email": "a@b.com", "password": "Abc123!@" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation");
    assert_eq!(body["status"], 422);
    // Underlying messages stay server-side outside development mode.
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn degraded_registration_fields_are_missing_parameters() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    // The password fails sanitization (no digit), degrading to empty.
    let res = client
        .post(format!("{}/user", srv.base_url))
        .json(&json!({ "name": "A", "email": "a@b.com", "password": "Abcdefg!" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "MissingParameters");
}

#[tokio::test]
async fn login_issues_a_cookie_the_session_endpoint_accepts() {
    let srv = TestServer::spawn().await;
    let hash = bcrypt::hash("Abc123!@", 4).unwrap();
    srv.db.stub_rows(
        "SELECT * FROM users WHERE email",
        vec![user_row(42, "A", "a@b.com", &hash)],
    );

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "a@b.com", "password": "Abc123!@" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = session_cookie(&res).expect("login sets the session cookie");
    let raw_header = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(raw_header.contains("HttpOnly"));
    assert!(raw_header.contains("SameSite=Lax"));
    assert!(raw_header.contains("Secure"));
    assert!(raw_header.contains("Max-Age=1209600"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["id"], 42);
    assert!(body["data"].get("password").is_none());

    // The cookie now authenticates the session endpoint.
    srv.db.stub_rows(
        "SELECT * FROM users WHERE id",
        vec![user_row(42, "A", "a@b.com", &hash)],
    );
    let res = client
        .get(format!("{}/auth/session", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "a@b.com");
}

#[tokio::test]
async fn failed_login_is_a_404_and_clears_the_cookie() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "a@b.com", "password": "Abc123!@" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let cookie = session_cookie(&res).expect("failed login clears the cookie");
    assert_eq!(cookie, format!("{SESSION_COOKIE}="));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let srv = TestServer::spawn().await;
    let cookie = srv.seed_session(42);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/logout", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Logged out successfully");

    let res = client
        .get(format!("{}/auth/session", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_missing_sessions_before_any_query() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/orders", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Authentication");
    assert!(srv.db.recorded().is_empty(), "handler ran without a session");
}

#[tokio::test]
async fn expired_sessions_do_not_authenticate() {
    let srv = TestServer::spawn().await;
    srv.sessions.insert_raw(Session {
        token: "staletoken1".to_string(),
        user_id: 42,
        expires_at: Utc::now() - Duration::seconds(5),
    });

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/auth/session", srv.base_url))
        .header(reqwest::header::COOKIE, format!("{SESSION_COOKIE}=staletoken1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_paging_is_forced_through_integer_sanitization() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    client
        .get(format!("{}/products", srv.base_url))
        .send()
        .await
        .unwrap();
    client
        .get(format!("{}/products?offset=5&limit=3", srv.base_url))
        .send()
        .await
        .unwrap();
    client
        .get(format!("{}/products?offset=-2&limit=12abc", srv.base_url))
        .send()
        .await
        .unwrap();

    let recorded = srv.db.recorded();
    assert_eq!(recorded[0].0, "SELECT * FROM products LIMIT 0, 10");
    assert_eq!(recorded[1].0, "SELECT * FROM products LIMIT 5, 3");
    // Negative offsets clamp to zero; a garbled limit falls back to the
    // default.
    assert_eq!(recorded[2].0, "SELECT * FROM products LIMIT 0, 10");
}

#[tokio::test]
async fn product_update_applies_only_provided_fields() {
    let srv = TestServer::spawn().await;
    let cookie = srv.seed_session(42);
    srv.db.stub_exec("UPDATE products SET", 1, 0);

    let client = reqwest::Client::new();
    let res = client
        .put(format!("{}/products/9", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .json(&json!({ "name": "Widget", "stock": "4" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let recorded = srv.db.recorded();
    assert_eq!(
        recorded[0].0,
        "UPDATE products SET name = ?, stock = ? WHERE id = ?"
    );
}

#[tokio::test]
async fn unknown_reports_are_not_found() {
    let srv = TestServer::spawn().await;
    let cookie = srv.seed_session(42);

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/report/bogus", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NotFound");
    assert_eq!(body["details"]["reportId"], "bogus");

    let res = client
        .get(format!("{}/report/orderStats", srv.base_url))
        .header(reqwest::header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_json_bodies_are_a_bad_request() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn oversized_bodies_are_rejected_before_decoding() {
    let srv = TestServer::spawn_with_config(ApiConfig {
        upload_max_size: 64,
        ..Default::default()
    })
    .await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/user", srv.base_url))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("x".repeat(256))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "PayloadTooLarge");
    assert!(srv.db.recorded().is_empty());
}

#[tokio::test]
async fn form_encoded_bodies_are_accepted() {
    let srv = TestServer::spawn().await;
    srv.db.stub_exec("INSERT INTO users", 1, 3);

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/user", srv.base_url))
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body("name=B&email=b%40c.com&password=Abc123!%40")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "b@c.com");
}
