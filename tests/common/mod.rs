//! Shared helpers for store-backed integration tests
//!
//! Tests skip themselves when `DATABASE_URL` is not set.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tasklane::{
    clock::FixedClock,
    config::ServerConfig,
    db,
    identity::{Credentials, DeviceInfo},
    server::build_router,
    AppContext,
};
use tower::ServiceExt;

pub const PASSWORD: &str = "correcthorse";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Context over the test database with the clock pinned to `today`
pub async fn context_on(today: NaiveDate) -> Option<AppContext> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ServerConfig::for_testing(&url);

    let pool = db::create_pool(&config.postgres).await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    Some(AppContext::from_parts(config, pool, Arc::new(FixedClock::on(today))).unwrap())
}

/// Unique address so reruns against the same database never collide
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@x.io", prefix, uuid::Uuid::new_v4().simple())
}

/// Register through the identity provider and return the user id
pub async fn register_user(ctx: &AppContext, email: &str) -> String {
    let tokens = ctx
        .identity
        .register(
            Credentials {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            },
            DeviceInfo::default(),
        )
        .await
        .unwrap();

    ctx.identity
        .verify_access_token(&tokens.access_token)
        .unwrap()
        .user_id
}

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            router: build_router(ctx),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), body).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register over HTTP and return the access token
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/register",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/login",
                None,
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }
}

/// Ids of `tasks` arrays inside a grouped response
pub fn task_ids(group: &Value) -> Vec<String> {
    group["tasks"]
        .as_array()
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|t| t["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
