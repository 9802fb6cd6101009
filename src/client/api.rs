use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::{
    auth::dto::LoginRequest,
    users::dto::{CreateUserRequest, HealthResponse, PublicUser, UpdateUserRequest},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, DNS failure or timeout.
    #[error("API unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("{detail}")]
    Status { status: StatusCode, detail: String },
    #[error("unexpected API response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ApiError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Unreachable(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Thin JSON client for the user-management API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<PublicUser, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        decode(self.http.post(self.url("/auth/login")).json(&body).send().await).await
    }

    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<PublicUser>, ApiError> {
        let mut req = self.http.get(self.url("/users/"));
        if let Some(q) = search.filter(|q| !q.trim().is_empty()) {
            req = req.query(&[("q", q)]);
        }
        decode(req.send().await).await
    }

    pub async fn get_user(&self, id: i64) -> Result<PublicUser, ApiError> {
        decode(self.http.get(self.url(&format!("/users/{id}"))).send().await).await
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<PublicUser, ApiError> {
        decode(self.http.post(self.url("/users/")).json(req).send().await).await
    }

    pub async fn update_user(
        &self,
        id: i64,
        req: &UpdateUserRequest,
    ) -> Result<PublicUser, ApiError> {
        decode(
            self.http
                .put(self.url(&format!("/users/{id}")))
                .json(req)
                .send()
                .await,
        )
        .await
    }

    pub async fn toggle_active(&self, id: i64) -> Result<PublicUser, ApiError> {
        decode(
            self.http
                .post(self.url(&format!("/users/{id}/toggle-active")))
                .send()
                .await,
        )
        .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let _: serde_json::Value = decode(
            self.http
                .delete(self.url(&format!("/users/{id}")))
                .send()
                .await,
        )
        .await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        decode(self.http.get(self.url("/health")).send().await).await
    }
}

async fn decode<T: DeserializeOwned>(
    sent: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, ApiError> {
    let res = sent.map_err(ApiError::Unreachable)?;
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.detail,
            Err(_) if !text.trim().is_empty() => text.trim().to_string(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        debug!(%status, %detail, "api returned error");
        return Err(ApiError::Status { status, detail });
    }
    res.json::<T>().await.map_err(ApiError::Decode)
}
