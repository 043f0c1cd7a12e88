//! Configuration Management
//!
//! Handles persistent settings for mdpool.

use crate::azure::auth::{self, DEFAULT_AUTHORITY};
use crate::azure::client::{DEFAULT_ENDPOINT, DEFAULT_POLL_INTERVAL};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Subscription pools are created in
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Tenant of the service principal
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Client ID of the service principal
    #[serde(default)]
    pub client_id: Option<String>,
    /// Resource Manager endpoint, for sovereign clouds
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Entra authority used for client-secret sign-in
    #[serde(default)]
    pub authority: Option<String>,
    /// Seconds between long-running operation polls
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mdpool").join("config.json"))
    }

    /// Load settings from disk
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective subscription (CLI > settings > environment > Azure CLI profile)
    pub fn effective_subscription(&self, cli: Option<&str>) -> Option<String> {
        cli.map(|s| s.to_string())
            .or_else(|| self.subscription_id.clone())
            .or_else(auth::get_default_subscription)
    }

    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn effective_authority(&self) -> String {
        self.authority
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Set subscription and save
    pub fn set_subscription(&mut self, subscription_id: &str) -> Result<()> {
        match Self::settings_path() {
            Some(path) => self.set_subscription_at(subscription_id, &path),
            None => bail!("no configuration directory to save settings in"),
        }
    }

    pub fn set_subscription_at(&mut self, subscription_id: &str, path: &Path) -> Result<()> {
        if !auth::validate_subscription_id(subscription_id) {
            bail!("invalid subscription ID {:?}", subscription_id);
        }
        self.subscription_id = Some(subscription_id.to_string());
        self.save_to(path)
    }
}
