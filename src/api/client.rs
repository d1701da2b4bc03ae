//! Review Service HTTP Client
//!
//! Typed access to the REST endpoints. Each call is a single HTTP
//! transaction: no retries, bearer auth when a token is installed.
//!
//! # Example
//!
//! ```ignore
//! use onboard_review::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let auth = client.login("new.hire@example.com", "hunter2").await?;
//! client.set_token(Some(auth.token)).await;
//! let reviews = client.list_reviews().await?;
//! ```

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::api::types::{
    ApiEnvelope, AuthPayload, DailyLimitUpdate, FeedbackStatusUpdate, LoginRequest, NewReview,
    NewSubmission, RawFeatureUsage, RegisterRequest, Review, User,
};
use crate::config::ApiConfig;
use crate::error::{ClientError, Result};
use crate::feedback::CodeSubmission;
use crate::metrics;
use crate::usage::{FeatureKey, FeatureUsage, UsageSource};

/// HTTP client for the review service
///
/// Cloning is cheap; clones share the connection pool and the token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Reqwest HTTP client
    http: reqwest::Client,

    /// Service base URL without trailing slash
    base_url: String,

    /// Bearer token, installed by the session layer
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a client for the configured service
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the service base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install or clear the bearer token
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Currently installed token
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<T>> {
        let method_label = method.as_str().to_string();
        let result = self.send_inner(method, path, body).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ClientError::Unauthorized) => "unauthorized",
            Err(ClientError::Http { .. }) => "http_error",
            Err(ClientError::Api(_)) => "rejected",
            Err(ClientError::Decode(_)) | Err(ClientError::Json(_)) => "decode_error",
            Err(ClientError::Timeout) => "timeout",
            Err(_) => "network_error",
        };
        metrics::record_api_request(&method_label, outcome);

        result
    }

    async fn send_inner<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<T>> {
        tracing::debug!("{} {}", method, path);

        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = self.token.read().await.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!("{} rejected the session token", path);
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("{}: {}", path, e)))?;

        if !envelope.success {
            return Err(ClientError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }

        Ok(envelope.data)
    }

    /// Send a request whose envelope must carry data
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        self.send(method, path, body)
            .await?
            .ok_or_else(|| ClientError::Decode(format!("{}: response has no data", path)))
    }

    /// Send a request where only `success` matters
    async fn acknowledge(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        self.send::<serde_json::Value>(method, path, body).await?;
        Ok(())
    }

    // Auth

    /// `GET /api/auth/me`
    pub async fn me(&self) -> Result<User> {
        self.fetch(Method::GET, "/api/auth/me", None).await
    }

    /// `POST /api/auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.fetch(Method::POST, "/api/auth/login", Some(body)).await
    }

    /// `POST /api/auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload> {
        let body = serde_json::to_value(request)?;
        self.fetch(Method::POST, "/api/auth/register", Some(body))
            .await
    }

    /// `POST /api/auth/logout`
    pub async fn logout(&self) -> Result<()> {
        self.acknowledge(Method::POST, "/api/auth/logout", None)
            .await
    }

    // Usage limits

    /// `GET /api/usage-limits/my-usage`
    pub async fn my_usage(&self) -> Result<HashMap<String, RawFeatureUsage>> {
        self.fetch(Method::GET, "/api/usage-limits/my-usage", None)
            .await
    }

    /// `PATCH /api/usage-limits/:featureKey` (admin only)
    pub async fn set_daily_limit(&self, feature: &FeatureKey, daily_limit: u32) -> Result<()> {
        let body = serde_json::to_value(DailyLimitUpdate { daily_limit })?;
        let path = format!("/api/usage-limits/{}", feature);
        self.acknowledge(Method::PATCH, &path, Some(body)).await
    }

    // Reviews and submissions

    /// `GET /api/reviews`
    pub async fn list_reviews(&self) -> Result<Vec<Review>> {
        self.fetch(Method::GET, "/api/reviews", None).await
    }

    /// `POST /api/reviews`
    pub async fn create_review(&self, review: &NewReview) -> Result<Review> {
        let body = serde_json::to_value(review)?;
        self.fetch(Method::POST, "/api/reviews", Some(body)).await
    }

    /// `GET /api/submissions/review/:id`
    pub async fn review_submissions(&self, review_id: i64) -> Result<Vec<CodeSubmission>> {
        let path = format!("/api/submissions/review/{}", review_id);
        self.fetch(Method::GET, &path, None).await
    }

    /// `POST /api/submissions`
    pub async fn create_submission(&self, submission: &NewSubmission) -> Result<CodeSubmission> {
        let body = serde_json::to_value(submission)?;
        self.fetch(Method::POST, "/api/submissions", Some(body))
            .await
    }

    // Feedback

    /// `PATCH /api/feedback/:id/status`
    pub async fn set_feedback_status(&self, feedback_id: i64, is_resolved: bool) -> Result<()> {
        let body = serde_json::to_value(FeedbackStatusUpdate { is_resolved })?;
        let path = format!("/api/feedback/{}/status", feedback_id);
        self.acknowledge(Method::PATCH, &path, Some(body)).await
    }
}

#[async_trait]
impl UsageSource for ApiClient {
    async fn fetch_usage(&self) -> Result<BTreeMap<FeatureKey, FeatureUsage>> {
        let raw = self.my_usage().await?;
        Ok(raw
            .into_iter()
            .map(|(key, entry)| (FeatureKey::new(key), FeatureUsage::new(entry.used, entry.limit)))
            .collect())
    }

    async fn update_daily_limit(&self, feature: &FeatureKey, daily_limit: u32) -> Result<()> {
        self.set_daily_limit(feature, daily_limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(url: &str) -> ApiConfig {
        ApiConfig {
            base_url: url.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ApiClient::new(&config("https://review.example.com/")).unwrap();
        assert_eq!(client.base_url(), "https://review.example.com");
        assert_eq!(
            client.url("/api/reviews"),
            "https://review.example.com/api/reviews"
        );
    }

    #[test]
    fn test_config_timeout() {
        assert_eq!(config("http://x").timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_token_is_shared_between_clones() {
        let client = ApiClient::new(&config("http://localhost:3000")).unwrap();
        let clone = client.clone();

        client.set_token(Some("abc".to_string())).await;
        assert_eq!(clone.token().await.as_deref(), Some("abc"));

        clone.set_token(None).await;
        assert!(client.token().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = ApiClient::new(&config("http://127.0.0.1:9")).unwrap();
        let result = client.list_reviews().await;
        assert!(matches!(
            result,
            Err(ClientError::Network(_)) | Err(ClientError::Timeout)
        ));
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
    }
}
