//! Agent configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SwKitError};

/// Background agent configuration.
///
/// Deployments normally compile this in through [`Default`]; bumping
/// `cache_version` is the only way to invalidate cached resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Application prefix of the cache bucket name.
    pub app_name: String,

    /// Cache version tag
    pub cache_version: u32,

    /// Scope URL the agent controls. Manifest paths resolve against it.
    pub scope: Url,

    /// Resources pre-cached at install, in order.
    pub precache: Vec<String>,

    /// Fallback values for push notifications
    pub notifications: NotificationDefaults,
}

/// Defaults applied to push envelopes that omit a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    /// Generic title, also used for plaintext payloads.
    pub title: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: "pwa".to_string(),
            cache_version: 1,
            scope: Url::parse("http://localhost:3000/").expect("static scope URL is valid"),
            precache: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/favicon.ico".to_string(),
                "/logo192.png".to_string(),
            ],
            notifications: NotificationDefaults::default(),
        }
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "New notification".to_string(),
            icon: "/logo192.png".to_string(),
            badge: "/favicon.ico".to_string(),
            tag: "default".to_string(),
        }
    }
}

impl AgentConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SwKitError::config_with_source("invalid agent configuration", e))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SwKitError::config_with_source(format!("cannot read {}", path.display()), e)
        })?;
        Self::from_json(&contents)
    }

    /// Name of the bucket owned by this version, e.g. `pwa-cache-v1`.
    pub fn cache_name(&self) -> String {
        format!("{}-cache-v{}", self.app_name, self.cache_version)
    }

    /// Root URL of the scope's origin.
    pub fn root_url(&self) -> Url {
        let mut root = self.scope.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }

    /// Resolve a path or URL against the scope.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.scope.join(path)?)
    }
}
