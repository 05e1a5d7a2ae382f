#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::Form;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use explorer_client::app::{Navigator, View};
use explorer_client::config::ClientSettings;
use explorer_client::models::{TransferProgress, UserProfile};
use explorer_client::operations::Listing;
use explorer_client::services::{CredentialExchange, TemporaryCredentials};
use explorer_core::config::TelemetryConfig;
use explorer_core::error::AppError;
use secrecy::Secret;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

pub const GOOD_CODE: &str = "good-code";
pub const ACCESS_TOKEN: &str = "access-token";
pub const ID_TOKEN: &str = "id-token";

async fn token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let valid = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("client_id").map(String::as_str) == Some("client123")
        && form.get("code").map(String::as_str) == Some(GOOD_CODE)
        && form.get("redirect_uri").map(String::as_str) == Some("http://localhost:8765/callback");

    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "id_token": ID_TOKEN,
            "access_token": ACCESS_TOKEN,
            "refresh_token": "refresh-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })),
    )
}

async fn user_info(headers: HeaderMap) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_token" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "sub": "8f3c",
            "email": "ada@example.com",
            "username": "ada"
        })),
    )
}

/// Stand-in for the hosted UI token and userInfo endpoints.
pub async fn spawn_identity_service() -> SocketAddr {
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .route("/oauth2/userInfo", get(user_info));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn settings(hosted_ui: &str) -> ClientSettings {
    ClientSettings {
        region: "us-east-1".to_string(),
        user_pool_id: "us-east-1_AbCdEf".to_string(),
        user_pool_client_id: "client123".to_string(),
        identity_pool_id: "us-east-1:1111-2222".to_string(),
        data_bucket_name: "data-bucket".to_string(),
        cognito_domain: hosted_ui.to_string(),
        redirect_origin: "http://localhost:8765".to_string(),
        identity_provider: None,
        download_dir: PathBuf::from("downloads"),
        storage_endpoint: None,
        telemetry: TelemetryConfig::default(),
    }
}

pub fn credentials() -> TemporaryCredentials {
    TemporaryCredentials {
        identity_id: "us-east-1:identity".to_string(),
        access_key_id: "ASIATEST".to_string(),
        secret_access_key: Secret::new("secret".to_string()),
        session_token: Secret::new("session".to_string()),
        expiration: None,
    }
}

/// Credential exchange that accepts only [`ID_TOKEN`].
pub struct StaticExchange {
    pub fail: bool,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl StaticExchange {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            tokens_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CredentialExchange for StaticExchange {
    async fn exchange(&self, id_token: &str) -> Result<TemporaryCredentials, AppError> {
        self.tokens_seen.lock().unwrap().push(id_token.to_string());
        if self.fail || id_token != ID_TOKEN {
            return Err(AppError::auth("NotAuthorizedException"));
        }
        Ok(credentials())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Alert(String),
    Status(String),
    User(Option<String>),
    Listing(Listing),
    Progress(String, u8),
}

#[derive(Default)]
pub struct RecordingView {
    pub shown: Mutex<Vec<Shown>>,
}

impl RecordingView {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Alert(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_listing(&self) -> Option<Listing> {
        self.shown().into_iter().rev().find_map(|s| match s {
            Shown::Listing(listing) => Some(listing),
            _ => None,
        })
    }

    fn push(&self, shown: Shown) {
        self.shown.lock().unwrap().push(shown);
    }
}

impl View for RecordingView {
    fn alert(&self, message: &str) {
        self.push(Shown::Alert(message.to_string()));
    }

    fn status(&self, message: &str) {
        self.push(Shown::Status(message.to_string()));
    }

    fn show_user(&self, profile: Option<&UserProfile>) {
        self.push(Shown::User(profile.map(|p| p.display_name().to_string())));
    }

    fn show_listing(&self, listing: &Listing) {
        self.push(Shown::Listing(listing.clone()));
    }

    fn show_progress(&self, progress: &TransferProgress) {
        self.push(Shown::Progress(progress.key.clone(), progress.percent()));
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }
}
