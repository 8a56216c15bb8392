//! End-to-end account flows driven through the HTTP router.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use regex::Regex;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use bytechs_accounts::{
    api::{AppState, RouterBuilder},
    config::AccountPolicy,
    service::{EmailConfig, EmailService, JwtService, MemoryTransport},
    store::MemoryStore,
    DEFAULT_INTERESTS,
};

const EMAIL: &str = "sara.ali@gmail.com";
const PASSWORD: &str = "SecurePass1!";

struct TestApp {
    router: Router,
    mail: Arc<MemoryTransport>,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::with_interests(DEFAULT_INTERESTS.iter().copied()).await);
        let mail = Arc::new(MemoryTransport::new());
        let email = EmailService::new(EmailConfig::default(), mail.clone()).unwrap();
        let jwt = JwtService::new(
            store.clone(),
            "integration_access".to_string(),
            "integration_refresh".to_string(),
        );
        let policy = AccountPolicy {
            bcrypt_cost: 4,
            ..AccountPolicy::default()
        };

        let state = AppState::new(store, jwt, email, policy);
        Self {
            router: RouterBuilder::with_all_routes().build(state),
            mail,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, bearer).await
    }

    fn last_mail_body(&self, to: &str) -> String {
        self.mail.last_to(to).expect("no mail sent").text_body
    }

    async fn first_interest_id(&self) -> String {
        let (status, body) = self.get("/interests", None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"][0]["id"].as_str().unwrap().to_string()
    }

    async fn sign_up(&self) -> (StatusCode, Value) {
        let interest_id = self.first_interest_id().await;
        self.post(
            "/auth/signup",
            json!({
                "full_name": "Sara Ali",
                "email": EMAIL,
                "phone_number": "512345678",
                "password": PASSWORD,
                "confirm_password": PASSWORD,
                "interest_ids": [interest_id],
            }),
        )
        .await
    }

    async fn verify_from_mail(&self) {
        let body = self.last_mail_body(EMAIL);
        let token = Regex::new(r"token=([A-Za-z0-9]+)")
            .unwrap()
            .captures(&body)
            .unwrap()[1]
            .to_string();
        let (status, _) = self.post("/auth/verify-email", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn login(&self, password: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/login",
            json!({ "email": EMAIL, "password": password, "remember_me": true }),
        )
        .await
    }
}

fn mailed_code(body: &str) -> String {
    Regex::new(r"Code: (\d{4})").unwrap().captures(body).unwrap()[1].to_string()
}

#[tokio::test]
async fn sign_up_verify_and_reach_home_screen() {
    let app = TestApp::new().await;

    let (status, body) = app.sign_up().await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["phone"], "+966512345678");
    assert_eq!(body["data"]["user"]["email_verified"], false);

    let (status, body) = app.login(PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    app.verify_from_mail().await;

    let (status, body) = app.login(PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["refresh_expires_in"], 30 * 24 * 3600);
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/me", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["greeting"], "Hi Sara Ali");
    assert_eq!(body["data"]["interests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected() {
    let app = TestApp::new().await;
    assert_eq!(app.sign_up().await.0, StatusCode::CREATED);

    let (status, body) = app.sign_up().await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "An account with this email already exists.");
}

#[tokio::test]
async fn weak_password_returns_checklist() {
    let app = TestApp::new().await;
    let interest_id = app.first_interest_id().await;

    let (status, body) = app
        .post(
            "/auth/signup",
            json!({
                "full_name": "Sara Ali",
                "email": EMAIL,
                "phone_number": "512345678",
                "password": "password",
                "confirm_password": "password",
                "interest_ids": [interest_id],
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please meet all password requirements.");
    assert_eq!(body["details"]["checklist"]["matches"], true);
    assert!(!body["details"]["unmet"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn forgot_password_flow_replaces_password() {
    let app = TestApp::new().await;
    app.sign_up().await;
    app.verify_from_mail().await;

    let (status, body) = app.login(PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    let old_refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/auth/password/forgot", json!({ "email": EMAIL }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in"], 300);

    let (status, body) = app
        .get(&format!("/auth/password/code-status?email={}", EMAIL), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], true);

    let (status, body) = app
        .post("/auth/password/verify-code", json!({ "email": EMAIL, "code": "12" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Enter the full 4-digit code.");

    let code = mailed_code(&app.last_mail_body(EMAIL));
    let (status, body) = app
        .post("/auth/password/verify-code", json!({ "email": EMAIL, "code": code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["data"]["reset_token"].as_str().unwrap().to_string();

    let new_password = "BrandNew2@";
    let (status, _) = app
        .post(
            "/auth/password/reset",
            json!({
                "reset_token": reset_token,
                "password": new_password,
                "confirm_password": new_password,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.login(PASSWORD).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login(new_password).await.0, StatusCode::OK);

    let (status, _) = app
        .post("/auth/refresh", json!({ "refresh_token": old_refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_password_for_unknown_email() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post("/auth/password/forgot", json!({ "email": "nobody@gmail.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No user found with this email.");
}

#[tokio::test]
async fn refresh_and_sign_out() {
    let app = TestApp::new().await;
    app.sign_up().await;
    app.verify_from_mail().await;

    let (_, body) = app.login(PASSWORD).await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/auth/refresh", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());

    let (status, _) = app
        .post("/auth/signout", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/auth/refresh", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contact_form_relays_to_inbox() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/contact",
            json!({ "name": "Omar", "email": "omar@example.com", "message": "Hello team" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Message sent successfully!");

    let relayed = app.mail.last_to("hello@bytechs.app").unwrap();
    assert_eq!(relayed.reply_to.as_deref(), Some("omar@example.com"));
    assert!(relayed.text_body.contains("Hello team"));

    let (status, body) = app
        .post(
            "/contact",
            json!({ "name": "Omar", "email": "not-an-email", "message": "Hello" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn health_reports_version() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["version"], bytechs_accounts::VERSION);
}
