//! Common test utilities for API tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot` over an
//! in-memory store, so no database or network is needed.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tenantry_api::app::{build_router, AppState};
use tenantry_api::config::Config;
use tenantry_shared::notify::LogNotifier;
use tenantry_shared::store::memory::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Secret123!";

/// Test context containing the router and its backing store
pub struct TestContext {
    pub app: axum::Router,
    pub store: MemoryStore,
}

/// A signed-up user and their session token
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgresql://unused/test".to_string()),
        "JWT_SECRET" => Some("test-secret-key-at-least-32-bytes-long".to_string()),
        _ => None,
    })
    .expect("test config")
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), Arc::new(LogNotifier), test_config());

        Self {
            app: build_router(state),
            store,
        }
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty or non-JSON body)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn signup(&self, email: &str) -> TestUser {
        let (status, body) = self
            .send(
                "POST",
                "/v1/auth/signup",
                None,
                Some(json!({ "email": email, "name": "Test User", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email: email.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a company as `owner` and returns its id
    pub async fn create_company(&self, owner: &TestUser, name: &str) -> Uuid {
        let (status, body) = self
            .send(
                "POST",
                "/v1/companies",
                Some(&owner.token),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create company failed: {}", body);

        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Invites `email` and returns the invite token
    pub async fn invite(&self, sender: &TestUser, company_id: Uuid, email: &str, role: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                &format!("/v1/companies/{}/invites", company_id),
                Some(&sender.token),
                Some(json!({ "email": email, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);

        body["token"].as_str().unwrap().to_string()
    }

    /// Signs up `email` and brings them into the company through an invite
    pub async fn member(&self, owner: &TestUser, company_id: Uuid, email: &str, role: &str) -> TestUser {
        let user = self.signup(email).await;
        let token = self.invite(owner, company_id, email, role).await;

        let (status, body) = self
            .send(
                "POST",
                "/v1/auth/accept-invite",
                None,
                Some(json!({ "token": token })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "accept failed: {}", body);

        TestUser {
            token: body["token"].as_str().unwrap().to_string(),
            ..user
        }
    }
}
