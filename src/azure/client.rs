//! ARM Client
//!
//! Main client for Azure Resource Manager, combining authentication
//! and HTTP functionality.

use super::auth::AzureCredentials;
use super::error::Result;
use super::http::{ArmHttpClient, ArmResponse};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Public-cloud Resource Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Delay between polls when the service sends no `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    pub credentials: AzureCredentials,
    pub http: ArmHttpClient,
    pub endpoint: String,
    pub subscription_id: String,
    pub poll_interval: Duration,
}

impl ArmClient {
    /// Create a new ARM client
    pub fn new(credentials: AzureCredentials, subscription_id: &str) -> Result<Self> {
        Ok(Self {
            credentials,
            http: ArmHttpClient::new()?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Point the client at another Resource Manager endpoint (sovereign clouds, tests)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Run `call` with a bearer token, retrying once with a fresh token on 401
    async fn authorized<F, Fut>(&self, call: F) -> Result<ArmResponse>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ArmResponse>>,
    {
        let token = self.get_token().await?;
        match call(token).await {
            Err(e) if e.status() == Some(401) => {
                tracing::warn!("Request was rejected as unauthorized, refreshing token");
                let token = self.credentials.refresh_token().await?;
                call(token).await
            }
            other => other,
        }
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<ArmResponse> {
        self.authorized(|token| async move { self.http.get(url, &token).await })
            .await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: &Value) -> Result<ArmResponse> {
        self.authorized(|token| async move { self.http.put(url, &token, body).await })
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<ArmResponse> {
        self.authorized(|token| async move { self.http.delete(url, &token).await })
            .await
    }

    /// Build a resource URL from an ARM resource path
    pub fn resource_url(&self, resource_path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.endpoint, resource_path, api_version
        )
    }
}
