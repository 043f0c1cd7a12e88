//! Azure Authentication
//!
//! Bearer tokens for Azure Resource Manager, either taken verbatim from
//! `AZURE_ACCESS_TOKEN` or obtained for a service principal through
//! `azure_identity`. Subscription discovery reads the environment and
//! the Azure CLI profile.

use super::error::{ApiError, Result};
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_identity::ClientSecretCredential;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

/// Default scope for ARM access
pub const DEFAULT_SCOPE: &str = "https://management.azure.com/.default";

/// Default Microsoft Entra authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// A bearer token and its lifetime, when known
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, scope: &str) -> Result<AccessToken>;
}

/// Fixed token, typically from `az account get-access-token`
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_in: None,
        })
    }
}

/// Service principal secret exchanged at the Entra token endpoint
pub struct ClientSecretProvider {
    credential: ClientSecretCredential,
}

impl ClientSecretProvider {
    pub fn new(
        authority: &str,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let authority_host = Url::parse(authority)
            .map_err(|e| ApiError::Auth(format!("invalid authority {:?}: {}", authority, e)))?;
        Ok(Self {
            credential: ClientSecretCredential::new(
                azure_core::new_http_client(),
                authority_host,
                tenant_id.into(),
                client_id.into(),
                client_secret.into(),
            ),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientSecretProvider {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        tracing::debug!("Requesting token for {}", scope);

        let token = self
            .credential
            .get_token(&[scope])
            .await
            .map_err(|e| ApiError::Auth(format!("token request failed: {}", e)))?;

        let remaining = token.expires_on.unix_timestamp() - chrono::Utc::now().timestamp();
        Ok(AccessToken {
            token: token.token.secret().to_string(),
            expires_in: u64::try_from(remaining).ok().map(Duration::from_secs),
        })
    }
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    provider: Arc<dyn TokenProvider>,
    scope: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl AzureCredentials {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            scope: DEFAULT_SCOPE.to_string(),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials from a fixed token
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticTokenProvider::new(token)))
    }

    /// Resolve credentials from the environment.
    ///
    /// `AZURE_ACCESS_TOKEN` wins; otherwise `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
    /// and `AZURE_CLIENT_SECRET` must all be set. `tenant_id` and `client_id`
    /// fill in for the matching variables when given.
    pub fn from_env(
        authority: &str,
        tenant_id: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<Self> {
        if let Ok(token) = std::env::var("AZURE_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                tracing::debug!("Using static token from AZURE_ACCESS_TOKEN");
                return Ok(Self::from_token(token.trim()));
            }
        }

        let env_or = |name: &str, fallback: Option<&str>| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.map(|s| s.to_string()))
        };

        let tenant = env_or("AZURE_TENANT_ID", tenant_id);
        let client = env_or("AZURE_CLIENT_ID", client_id);
        let secret = env_or("AZURE_CLIENT_SECRET", None);

        match (tenant, client, secret) {
            (Some(tenant), Some(client), Some(secret)) => {
                tracing::debug!("Using client secret credentials for client {}", client);
                Ok(Self::new(Arc::new(ClientSecretProvider::new(
                    authority, tenant, client, secret,
                )?)))
            }
            _ => Err(ApiError::Auth(
                "no credentials found: set AZURE_ACCESS_TOKEN, or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET".to_string(),
            )),
        }
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self.provider.token(&self.scope).await?;

        let ttl = token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token.token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

/// Get the Azure CLI configuration directory
pub fn get_azure_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AZURE_CONFIG_DIR") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|p| p.join(".azure"))
}

/// Subscription IDs are GUIDs
pub fn validate_subscription_id(subscription: &str) -> bool {
    uuid::Uuid::parse_str(subscription).is_ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureProfile {
    #[serde(default)]
    subscriptions: Vec<ProfileSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSubscription {
    id: String,
    #[serde(default)]
    is_default: bool,
}

/// Pick the default subscription out of an `azureProfile.json` document
fn default_subscription_from_profile(content: &str) -> Option<String> {
    // The CLI writes this file with a UTF-8 BOM
    let content = content.trim_start_matches('\u{feff}');
    let profile: AzureProfile = serde_json::from_str(content).ok()?;
    profile
        .subscriptions
        .into_iter()
        .find(|s| s.is_default)
        .map(|s| s.id)
        .filter(|id| validate_subscription_id(id))
}

/// Read the default subscription from the environment or the Azure CLI profile
/// Security: Validates subscription ID format before returning
pub fn get_default_subscription() -> Option<String> {
    for var in ["AZURE_SUBSCRIPTION_ID", "ARM_SUBSCRIPTION_ID"] {
        if let Ok(subscription) = std::env::var(var) {
            if validate_subscription_id(&subscription) {
                return Some(subscription);
            }
            tracing::warn!("Invalid subscription ID format in {}", var);
        }
    }

    let profile_path = get_azure_config_dir()?.join("azureProfile.json");
    let content = std::fs::read_to_string(profile_path).ok()?;
    default_subscription_from_profile(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        expires_in: Option<Duration>,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn token(&self, _scope: &str) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken {
                token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in: Some(Duration::from_secs(3600)),
        });
        let creds = AzureCredentials::new(provider.clone());

        assert_eq!(creds.get_token().await.unwrap(), "token-0");
        assert_eq!(creds.get_token().await.unwrap(), "token-0");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        assert_eq!(creds.refresh_token().await.unwrap(), "token-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_not_reused() {
        // Lifetime below the expiry buffer: every call goes to the provider
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in: Some(Duration::from_secs(30)),
        });
        let creds = AzureCredentials::new(provider.clone());

        creds.get_token().await.unwrap();
        creds.get_token().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_subscription_from_profile() {
        let content = "\u{feff}{\"subscriptions\":[\
            {\"id\":\"11111111-1111-1111-1111-111111111111\",\"isDefault\":false},\
            {\"id\":\"22222222-2222-2222-2222-222222222222\",\"isDefault\":true}]}";
        assert_eq!(
            default_subscription_from_profile(content).as_deref(),
            Some("22222222-2222-2222-2222-222222222222")
        );
        assert!(default_subscription_from_profile("{}").is_none());
    }

    #[test]
    fn test_validate_subscription_id() {
        assert!(validate_subscription_id("00000000-0000-0000-0000-000000000000"));
        assert!(!validate_subscription_id("my-subscription"));
    }
}
