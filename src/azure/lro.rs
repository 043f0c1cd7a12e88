//! Long-running operation polling
//!
//! ARM reports progress of a PUT or DELETE in one of three ways, tried in order:
//! an `Azure-AsyncOperation` status document, a `Location` URL that answers
//! 202 until the work is done, or the resource's own `provisioningState`.

use super::client::ArmClient;
use super::error::{ApiError, Result};
use super::http::{ArmResponse, ErrorDetail};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Which mutation is being awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LroKind {
    Put,
    Delete,
}

/// Status of an operation as reported by ARM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Done,
    Failed(String),
    Running,
    Unknown(String),
}

impl OperationStatus {
    /// Classify an async-operation `status` or a `provisioningState`
    pub fn from_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Done,
            "failed" | "canceled" | "cancelled" => Self::Failed(state.to_string()),
            "accepted" | "running" | "inprogress" | "provisioning" | "creating" | "updating"
            | "deleting" => Self::Running,
            _ => Self::Unknown(state.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationDocument {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningEnvelope {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

fn provisioning_state(response: &ArmResponse) -> Option<String> {
    serde_json::from_str::<ProvisioningEnvelope>(&response.body)
        .ok()
        .and_then(|e| e.properties)
        .and_then(|p| p.provisioning_state)
}

/// Block until the operation started by `initial` reaches a terminal state
pub async fn wait_for_completion(
    client: &ArmClient,
    initial: &ArmResponse,
    resource_url: &str,
    kind: LroKind,
) -> Result<()> {
    let delay = initial.retry_after.unwrap_or(client.poll_interval);

    if let Some(operation_url) = &initial.async_operation {
        check_polling_url(client, operation_url)?;
        return poll_async_operation(client, operation_url, delay).await;
    }

    if initial.status == StatusCode::ACCEPTED {
        if let Some(location) = &initial.location {
            check_polling_url(client, location)?;
            return poll_location(client, location, delay).await;
        }
    }

    match kind {
        LroKind::Delete if initial.status == StatusCode::ACCEPTED => {
            poll_until_gone(client, resource_url, delay).await
        }
        LroKind::Delete => Ok(()),
        LroKind::Put => match provisioning_state(initial) {
            None => Ok(()),
            Some(state) => match OperationStatus::from_state(&state) {
                OperationStatus::Done => Ok(()),
                OperationStatus::Failed(status) => Err(ApiError::OperationFailed {
                    status,
                    code: None,
                    message: "resource provisioning did not succeed".to_string(),
                }),
                OperationStatus::Running | OperationStatus::Unknown(_) => {
                    poll_provisioning_state(client, resource_url, delay).await
                }
            },
        },
    }
}

/// Bearer tokens must only go back to the Resource Manager host
fn check_polling_url(client: &ArmClient, polling_url: &str) -> Result<()> {
    let invalid = |reason: &str| ApiError::InvalidPollingUrl {
        url: polling_url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(polling_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "https" | "http") {
        return Err(invalid("unsupported scheme"));
    }

    let endpoint = Url::parse(&client.endpoint).map_err(|e| invalid(&e.to_string()))?;
    if parsed.host_str() != endpoint.host_str()
        || parsed.port_or_known_default() != endpoint.port_or_known_default()
    {
        return Err(invalid("host does not match the Resource Manager endpoint"));
    }

    Ok(())
}

async fn poll_async_operation(client: &ArmClient, url: &str, mut delay: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(delay).await;

        let response = client.get(url).await?;
        let document: OperationDocument =
            serde_json::from_str(&response.body).map_err(|source| ApiError::Decode {
                context: "operation status",
                source,
            })?;

        match OperationStatus::from_state(&document.status) {
            OperationStatus::Done => {
                tracing::debug!("Operation {} succeeded", url);
                return Ok(());
            }
            OperationStatus::Failed(status) => {
                let detail = document.error;
                return Err(ApiError::OperationFailed {
                    status,
                    code: detail.as_ref().and_then(|d| d.code.clone()),
                    message: detail
                        .and_then(|d| d.message)
                        .unwrap_or_else(|| "no error details returned".to_string()),
                });
            }
            OperationStatus::Running => {}
            OperationStatus::Unknown(s) => {
                tracing::debug!("Unrecognised operation status {:?}, still polling", s);
            }
        }

        delay = response.retry_after.unwrap_or(client.poll_interval);
    }
}

async fn poll_location(client: &ArmClient, url: &str, mut delay: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(delay).await;

        let response = match client.get(url).await {
            Ok(r) => r,
            // A deleted resource's location can itself disappear once done
            Err(ApiError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        if response.status != StatusCode::ACCEPTED {
            tracing::debug!("Location {} reported {}", url, response.status);
            return Ok(());
        }

        delay = response.retry_after.unwrap_or(client.poll_interval);
    }
}

async fn poll_provisioning_state(client: &ArmClient, url: &str, mut delay: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(delay).await;

        let response = client.get(url).await?;
        let Some(state) = provisioning_state(&response) else {
            return Ok(());
        };

        match OperationStatus::from_state(&state) {
            OperationStatus::Done => return Ok(()),
            OperationStatus::Failed(status) => {
                return Err(ApiError::OperationFailed {
                    status,
                    code: None,
                    message: "resource provisioning did not succeed".to_string(),
                })
            }
            OperationStatus::Running | OperationStatus::Unknown(_) => {
                tracing::debug!("Provisioning state {}, still polling", state);
            }
        }

        delay = response.retry_after.unwrap_or(client.poll_interval);
    }
}

async fn poll_until_gone(client: &ArmClient, url: &str, mut delay: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(delay).await;

        match client.get(url).await {
            Err(ApiError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
            Ok(response) => delay = response.retry_after.unwrap_or(client.poll_interval),
        }
    }
}
