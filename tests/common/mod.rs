#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use blog_api::auth::password::hash_password;
use blog_api::database::Store;
use blog_api::{build_app, AppConfig, AppState};

pub const PASSWORD: &str = "secret-password";

/// The application router served on an ephemeral port over a fresh memory store
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let config = AppConfig::development();
        let state = AppState::in_memory(config.clone());
        let store = state.store.clone();
        let app = build_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind ephemeral port")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
        });

        Ok(Self { base_url, client: reqwest::Client::new(), store, config, handle })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Insert a user directly, bypassing registration rules
    pub async fn seed_user(&self, username: &str, is_admin: bool, is_active: bool) -> Result<String> {
        let document = json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": hash_password(PASSWORD, &self.config.security.secret_key),
            "isActive": is_active,
            "isAdmin": is_admin,
            "isStaff": false,
        });
        let created = self
            .store
            .create("users", document.as_object().cloned().context("user is an object")?)
            .await?;
        Ok(created["_id"].as_str().context("created user has an id")?.to_string())
    }

    /// Log in and return the full response body
    pub async fn login(&self, username: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        Ok(res.json().await?)
    }

    /// `Bearer <access>` header value for a seeded user
    pub async fn bearer(&self, username: &str) -> Result<String> {
        let body = self.login(username).await?;
        let access = body["bearer"]["access"].as_str().context("missing access token")?;
        Ok(format!("Bearer {}", access))
    }

    /// `Token <session>` header value for a seeded user
    pub async fn session(&self, username: &str) -> Result<String> {
        let body = self.login(username).await?;
        let token = body["token"].as_str().context("missing session token")?;
        Ok(format!("Token {}", token))
    }

    pub async fn create_category(&self, admin_auth: &str, name: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/categories"))
            .header("Authorization", admin_auth)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "category create failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["result"]["_id"].as_str().context("category id")?.to_string())
    }

    pub async fn create_blog(&self, auth: &str, category_id: &str, title: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/blogs"))
            .header("Authorization", auth)
            .json(&json!({ "blogCategoryId": category_id, "title": title, "content": "body text" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "blog create failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["result"]["_id"].as_str().context("blog id")?.to_string())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
