//! Notifications and an in-memory notification center.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use swkit_common::Result;
use tokio::sync::RwLock;
use tracing::debug;

use crate::capabilities::NotificationSink;

/// An action button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Fully normalized notification options. Every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: JsonValue,
    pub actions: Vec<NotificationAction>,
    pub renotify: bool,
    pub require_interaction: bool,
    pub silent: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A notification as handed to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub options: NotificationOptions,
}

impl Notification {
    /// Tag identifying the displayed notification.
    pub fn tag(&self) -> &str {
        &self.options.tag
    }

    /// The `data.url` string, if present.
    pub fn data_url(&self) -> Option<&str> {
        self.options.data.get("url").and_then(JsonValue::as_str)
    }
}

/// A notification currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedNotification {
    pub notification: Notification,
    /// Whether the user was alerted (sound/vibration) when it appeared.
    pub alerted: bool,
}

/// In-memory notification center keyed by tag.
///
/// A notification with an existing tag replaces the old one in place. The
/// replacement alerts the user again only when `renotify` is set.
#[derive(Debug, Default)]
pub struct MemoryNotificationCenter {
    displayed: RwLock<Vec<DisplayedNotification>>,
}

impl MemoryNotificationCenter {
    /// Create an empty center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Displayed notifications, optionally filtered by tag.
    pub async fn get_notifications(&self, tag: Option<&str>) -> Vec<DisplayedNotification> {
        self.displayed
            .read()
            .await
            .iter()
            .filter(|d| tag.map_or(true, |t| d.notification.tag() == t))
            .cloned()
            .collect()
    }

    /// Number of displayed notifications.
    pub async fn len(&self) -> usize {
        self.displayed.read().await.len()
    }

    /// Whether nothing is displayed.
    pub async fn is_empty(&self) -> bool {
        self.displayed.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationCenter {
    async fn show(&self, title: &str, options: NotificationOptions) -> Result<Notification> {
        let notification = Notification {
            title: title.to_string(),
            options,
        };

        let mut displayed = self.displayed.write().await;
        match displayed
            .iter_mut()
            .find(|d| d.notification.tag() == notification.tag())
        {
            Some(existing) => {
                let alerted = notification.options.renotify && !notification.options.silent;
                debug!(tag = %notification.tag(), alerted, "Replacing notification");
                *existing = DisplayedNotification {
                    notification: notification.clone(),
                    alerted,
                };
            }
            None => {
                let alerted = !notification.options.silent;
                displayed.push(DisplayedNotification {
                    notification: notification.clone(),
                    alerted,
                });
            }
        }

        Ok(notification)
    }

    async fn close(&self, tag: &str) -> Result<()> {
        self.displayed
            .write()
            .await
            .retain(|d| d.notification.tag() != tag);
        Ok(())
    }
}
