//! HTTP utilities for Azure Resource Manager REST calls

use super::error::{ApiError, Result};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A successful (2xx) response with the headers the poller needs
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub body: String,
    pub async_operation: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<Duration>,
}

impl ArmResponse {
    fn from_parts(status: StatusCode, headers: &HeaderMap, body: String) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        Self {
            status,
            body,
            async_operation: header_str(AZURE_ASYNC_OPERATION),
            location: header_str(LOCATION.as_str()),
            retry_after: header_str(RETRY_AFTER.as_str())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    /// Parse the body as JSON, treating an empty body as `None`
    pub fn json(&self) -> Result<Option<Value>> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                context: "response JSON",
                source,
            })
    }
}

/// HTTP client wrapper for ARM calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mdpool/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: &str) -> Result<ArmResponse> {
        self.execute(Method::GET, url, token, None).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<ArmResponse> {
        self.execute(Method::PUT, url, token, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: &str) -> Result<ArmResponse> {
        self.execute(Method::DELETE, url, token, None).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        let request_id = Uuid::new_v4();
        tracing::debug!("{} {} (request id {})", method, url, request_id);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(CLIENT_REQUEST_ID, request_id.to_string());

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Not found: {}", url);
            return Err(ApiError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            let detail = parse_error_detail(&body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                code: detail.as_ref().and_then(|d| d.code.clone()),
                message: detail
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        Ok(ArmResponse::from_parts(status, &headers, body))
    }
}

fn parse_error_detail(body: &str) -> Option<ErrorDetail> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error)
}

/// Format an ARM error for display
/// Security: Avoids echoing raw API payloads back to the terminal
pub fn format_arm_error(error: &ApiError) -> String {
    match error.status() {
        Some(401) => "Authentication failed. Check AZURE_ACCESS_TOKEN or the service principal settings.".to_string(),
        Some(403) => "Permission denied. Check the role assignments on the subscription.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. The pool may already exist or be in use.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => match error {
            ApiError::Status { message, .. } => format!("Invalid request: {}", truncate(message)),
            _ => "Invalid request. Check your configuration.".to_string(),
        },
        Some(s) if s >= 500 => "Azure service temporarily unavailable. Please try again.".to_string(),
        _ => truncate(&error.to_string()),
    }
}

fn truncate(message: &str) -> String {
    let sanitized: String = message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect();
    if sanitized.len() < message.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
