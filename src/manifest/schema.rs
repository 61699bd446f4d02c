use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,

    /// Install registry, processed in order
    #[serde(default)]
    pub packages: Vec<PackageRequest>,
}

/// One entry of the install registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequest {
    /// Package name in pacman and the AUR
    pub name: String,

    /// Flatpak application id, e.g. "com.discordapp.Discord"
    #[serde(
        default,
        alias = "flatpak",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub sandbox_id: Option<String>,

    /// Install from flatpak only, never from pacman or the AUR
    #[serde(default, alias = "force_flatpak")]
    pub force_sandbox: bool,
}

impl PackageRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sandbox_id: None,
            force_sandbox: false,
        }
    }

    pub fn with_sandbox(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.sandbox_id = if id.trim().is_empty() { None } else { Some(id) };
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_sandbox = true;
        self
    }

    pub fn sandbox_id(&self) -> Option<&str> {
        self.sandbox_id.as_deref()
    }

    /// Whether `query` names this entry by package name or flatpak id
    pub fn matches(&self, query: &str) -> bool {
        self.name == query || self.sandbox_id() == Some(query)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// AUR helper binary, also the AUR package it is bootstrapped from
    #[serde(default = "default_helper")]
    pub helper: String,

    /// Flatpak remote to install from
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_remote_url")]
    pub remote_url: String,

    /// Limit for read-only availability queries
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Limit for installs and bootstrap steps (AUR builds can be slow)
    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,
}

fn default_helper() -> String {
    paths::DEFAULT_HELPER.into()
}

fn default_remote() -> String {
    paths::DEFAULT_REMOTE.into()
}

fn default_remote_url() -> String {
    paths::DEFAULT_REMOTE_URL.into()
}

fn default_query_timeout() -> u64 {
    120
}

fn default_install_timeout() -> u64 {
    3600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            helper: default_helper(),
            remote: default_remote(),
            remote_url: default_remote_url(),
            query_timeout_secs: default_query_timeout(),
            install_timeout_secs: default_install_timeout(),
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}
