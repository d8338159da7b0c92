//! Push dispatcher: push payloads to notifications, and notification clicks
//! to window routing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use swkit_common::{AgentConfig, NotificationDefaults, Result, SwKitError};
use tracing::{debug, info, warn};
use url::Url;

use crate::capabilities::{NotificationSink, WindowRegistry};
use crate::clients::ClientMatchOptions;
use crate::notification::{Notification, NotificationAction, NotificationOptions};

/// Raw push payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessageData(Bytes);

impl PushMessageData {
    /// Wrap payload bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Payload bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Payload as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Parse the payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.0)?)
    }
}

/// An inbound push event.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub data: Option<PushMessageData>,
    /// Receipt time in ms since the Unix epoch.
    pub received_at: u64,
}

impl PushEvent {
    /// A push event received now.
    pub fn new(data: Option<PushMessageData>) -> Self {
        let received_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self { data, received_at }
    }

    /// A push event carrying `payload`, received now.
    pub fn with_payload(payload: impl Into<Bytes>) -> Self {
        Self::new(Some(PushMessageData::new(payload)))
    }
}

/// Structured push envelope. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEnvelope {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub renotify: Option<bool>,
    pub require_interaction: Option<bool>,
    pub silent: Option<bool>,
    pub timestamp: Option<f64>,
    pub data: Option<JsonValue>,
    pub actions: Option<Vec<NotificationAction>>,
}

impl PushEnvelope {
    /// Parse a payload. Only a JSON object is an envelope; arrays and scalars
    /// are rejected even when serde could map them onto the fields.
    pub fn parse(data: &PushMessageData) -> Result<Self> {
        match data.json::<JsonValue>()? {
            object @ JsonValue::Object(_) => Ok(serde_json::from_value(object)?),
            _ => Err(SwKitError::InvalidArgument(
                "push payload is not a JSON object".into(),
            )),
        }
    }
}

/// A click on a displayed notification.
#[derive(Debug, Clone)]
pub struct NotificationClickEvent {
    pub notification: Notification,
    /// Action button id, if a button rather than the body was clicked.
    pub action: Option<String>,
}

impl NotificationClickEvent {
    /// A click on the notification body.
    pub fn new(notification: Notification) -> Self {
        Self {
            notification,
            action: None,
        }
    }
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickRoute {
    /// Opened the notification's `data.url`.
    OpenedUrl(Url),
    /// Focused an existing window.
    Focused(String),
    /// No window was open; opened the origin root.
    OpenedRoot(Url),
    /// Routing failed; nothing happened.
    NoOp,
}

/// Turns push payloads into notifications and routes notification clicks.
#[derive(Debug, Clone)]
pub struct PushDispatcher {
    defaults: NotificationDefaults,
    scope: Url,
    root: Url,
}

impl PushDispatcher {
    /// Create a dispatcher from the agent configuration.
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            defaults: config.notifications.clone(),
            scope: config.scope.clone(),
            root: config.root_url(),
        }
    }

    /// Build the notification for a push event.
    ///
    /// A payload that is not a JSON object matching the envelope schema is
    /// shown as plain text under the generic title.
    pub fn render(&self, event: &PushEvent) -> Notification {
        let envelope = match event.data {
            Some(ref data) => match PushEnvelope::parse(data) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!(error = %e, "Push payload is not an envelope, using plain text");
                    return self.plaintext(data.text(), event.received_at);
                }
            },
            None => return self.plaintext(String::new(), event.received_at),
        };

        let defaults = &self.defaults;
        Notification {
            title: envelope.title.unwrap_or_else(|| defaults.title.clone()),
            options: NotificationOptions {
                body: envelope.body.unwrap_or_default(),
                icon: envelope.icon.unwrap_or_else(|| defaults.icon.clone()),
                badge: envelope.badge.unwrap_or_else(|| defaults.badge.clone()),
                tag: envelope.tag.unwrap_or_else(|| defaults.tag.clone()),
                data: envelope
                    .data
                    .unwrap_or_else(|| JsonValue::Object(Default::default())),
                actions: envelope.actions.unwrap_or_default(),
                renotify: envelope.renotify.unwrap_or(false),
                require_interaction: envelope.require_interaction.unwrap_or(false),
                silent: envelope.silent.unwrap_or(false),
                timestamp: envelope
                    .timestamp
                    .map(|t| t as u64)
                    .unwrap_or(event.received_at),
            },
        }
    }

    fn plaintext(&self, body: String, received_at: u64) -> Notification {
        let defaults = &self.defaults;
        Notification {
            title: defaults.title.clone(),
            options: NotificationOptions {
                body,
                icon: defaults.icon.clone(),
                badge: defaults.badge.clone(),
                tag: defaults.tag.clone(),
                data: JsonValue::Object(Default::default()),
                actions: Vec::new(),
                renotify: false,
                require_interaction: false,
                silent: false,
                timestamp: received_at,
            },
        }
    }

    /// Handle a push event. Completes once the notification is displayed.
    pub async fn handle_push(
        &self,
        sink: &dyn NotificationSink,
        event: PushEvent,
    ) -> Result<Notification> {
        let notification = self.render(&event);
        debug!(title = %notification.title, tag = %notification.tag(), "Showing notification");
        sink.show(&notification.title, notification.options).await
    }

    /// Handle a notification click.
    ///
    /// Closes the notification first, then opens `data.url`, or focuses the
    /// first open window of the origin, or opens the origin root. Failures are
    /// logged and yield [`ClickRoute::NoOp`].
    pub async fn handle_click(
        &self,
        sink: &dyn NotificationSink,
        windows: &dyn WindowRegistry,
        event: NotificationClickEvent,
    ) -> ClickRoute {
        let notification = event.notification;
        if let Err(e) = sink.close(notification.tag()).await {
            warn!(tag = %notification.tag(), error = %e, "Failed to close notification");
        }
        if let Some(ref action) = event.action {
            debug!(action = %action, "Notification action clicked");
        }

        let route = match notification.data_url() {
            Some(target) => self.open_target(windows, target).await,
            None => self.focus_or_open_root(windows).await,
        };

        match route {
            Ok(route) => {
                info!(route = ?route, "Notification click routed");
                route
            }
            Err(e) => {
                warn!(error = %e, category = e.category(), "Notification click routing failed");
                ClickRoute::NoOp
            }
        }
    }

    async fn open_target(&self, windows: &dyn WindowRegistry, target: &str) -> Result<ClickRoute> {
        let url = self.scope.join(target)?;
        windows.open_window(&url).await?;
        Ok(ClickRoute::OpenedUrl(url))
    }

    async fn focus_or_open_root(&self, windows: &dyn WindowRegistry) -> Result<ClickRoute> {
        let origin = self.root.origin();
        let existing = windows
            .match_all(ClientMatchOptions::windows())
            .await?
            .into_iter()
            .find(|c| c.url.origin() == origin);

        match existing {
            Some(client) => {
                let focused = windows.focus(&client.id).await?;
                Ok(ClickRoute::Focused(focused.id))
            }
            None => {
                windows.open_window(&self.root).await?;
                Ok(ClickRoute::OpenedRoot(self.root.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{Client, MemoryWindowRegistry};
    use crate::notification::MemoryNotificationCenter;
    use serde_json::json;

    fn dispatcher() -> PushDispatcher {
        PushDispatcher::new(&AgentConfig::default())
    }

    fn push(payload: &str) -> PushEvent {
        PushEvent {
            data: Some(PushMessageData::new(payload.to_string())),
            received_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_title_and_body_with_defaults() {
        let n = dispatcher().render(&push(r#"{"title":"Hi","body":"there"}"#));
        assert_eq!(n.title, "Hi");
        assert_eq!(n.options.body, "there");
        assert_eq!(n.options.icon, "/logo192.png");
        assert_eq!(n.options.badge, "/favicon.ico");
        assert_eq!(n.options.tag, "default");
        assert_eq!(n.options.data, json!({}));
        assert!(n.options.actions.is_empty());
        assert!(!n.options.renotify);
        assert!(!n.options.require_interaction);
        assert!(!n.options.silent);
        assert_eq!(n.options.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_full_envelope() {
        let payload = json!({
            "title": "Order shipped",
            "body": "Your parcel is on its way",
            "icon": "/img/truck.png",
            "badge": "/img/badge.png",
            "tag": "order-42",
            "renotify": true,
            "requireInteraction": true,
            "silent": true,
            "timestamp": 1234,
            "data": {"url": "/orders/42", "id": 42},
            "actions": [{"action": "track", "title": "Track"}]
        });
        let n = dispatcher().render(&push(&payload.to_string()));

        assert_eq!(n.title, "Order shipped");
        assert_eq!(n.options.icon, "/img/truck.png");
        assert_eq!(n.options.badge, "/img/badge.png");
        assert_eq!(n.options.tag, "order-42");
        assert!(n.options.renotify);
        assert!(n.options.require_interaction);
        assert!(n.options.silent);
        assert_eq!(n.options.timestamp, 1234);
        assert_eq!(n.data_url(), Some("/orders/42"));
        assert_eq!(n.options.actions.len(), 1);
        assert_eq!(n.options.actions[0].action, "track");
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let n = dispatcher().render(&push("{}"));
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, "");
    }

    #[test]
    fn test_plain_text_fallback() {
        let n = dispatcher().render(&push("plain text"));
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, "plain text");
        assert_eq!(n.options.tag, "default");
    }

    #[test]
    fn test_json_string_is_plain_text() {
        let n = dispatcher().render(&push(r#""quoted""#));
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, r#""quoted""#);
    }

    #[test]
    fn test_json_array_is_plain_text() {
        let raw = r#"["Hi","there",null,null,null,null,null,null,null,null,null]"#;
        let n = dispatcher().render(&push(raw));
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, raw);
        assert!(PushEnvelope::parse(&PushMessageData::new(raw)).is_err());
    }

    #[test]
    fn test_mistyped_field_is_plain_text() {
        let raw = r#"{"title": 42}"#;
        let n = dispatcher().render(&push(raw));
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, raw);
    }

    #[test]
    fn test_missing_payload() {
        let n = dispatcher().render(&PushEvent {
            data: None,
            received_at: 5,
        });
        assert_eq!(n.title, "New notification");
        assert_eq!(n.options.body, "");
        assert_eq!(n.options.timestamp, 5);
    }

    #[tokio::test]
    async fn test_handle_push_shows() {
        let center = MemoryNotificationCenter::new();
        let shown = dispatcher()
            .handle_push(&center, push(r#"{"title":"Hi"}"#))
            .await
            .unwrap();
        assert_eq!(shown.title, "Hi");
        assert_eq!(center.len().await, 1);
    }

    async fn click(
        center: &MemoryNotificationCenter,
        windows: &MemoryWindowRegistry,
        payload: &str,
    ) -> ClickRoute {
        let d = dispatcher();
        let notification = d.handle_push(center, push(payload)).await.unwrap();
        d.handle_click(center, windows, NotificationClickEvent::new(notification))
            .await
    }

    #[tokio::test]
    async fn test_click_opens_data_url() {
        let center = MemoryNotificationCenter::new();
        let windows = MemoryWindowRegistry::new();
        windows
            .add(Client::window("w1", Url::parse("http://localhost:3000/").unwrap()))
            .await;

        let route = click(
            &center,
            &windows,
            r#"{"data":{"url":"https://example.com/x"}}"#,
        )
        .await;

        assert_eq!(
            route,
            ClickRoute::OpenedUrl(Url::parse("https://example.com/x").unwrap())
        );
        assert!(center.is_empty().await);
        assert_eq!(windows.len().await, 2);
    }

    #[tokio::test]
    async fn test_click_resolves_relative_url() {
        let center = MemoryNotificationCenter::new();
        let windows = MemoryWindowRegistry::new();
        let route = click(&center, &windows, r#"{"data":{"url":"/inbox"}}"#).await;
        assert_eq!(
            route,
            ClickRoute::OpenedUrl(Url::parse("http://localhost:3000/inbox").unwrap())
        );
    }

    #[tokio::test]
    async fn test_click_focuses_first_window() {
        let center = MemoryNotificationCenter::new();
        let windows = MemoryWindowRegistry::new();
        windows
            .add(Client::window("other", Url::parse("https://elsewhere.test/").unwrap()))
            .await;
        windows
            .add(Client::window("w1", Url::parse("http://localhost:3000/a").unwrap()))
            .await;
        windows
            .add(Client::window("w2", Url::parse("http://localhost:3000/b").unwrap()))
            .await;

        let route = click(&center, &windows, r#"{"title":"Hi"}"#).await;

        assert_eq!(route, ClickRoute::Focused("w1".to_string()));
        assert_eq!(windows.len().await, 3);
        assert!(windows.get("w1").await.unwrap().focused);
    }

    #[tokio::test]
    async fn test_click_opens_root_without_windows() {
        let center = MemoryNotificationCenter::new();
        let windows = MemoryWindowRegistry::new();

        let route = click(&center, &windows, "plain text").await;

        assert_eq!(
            route,
            ClickRoute::OpenedRoot(Url::parse("http://localhost:3000/").unwrap())
        );
        assert_eq!(windows.len().await, 1);
    }

    #[tokio::test]
    async fn test_click_with_invalid_url_is_noop() {
        let center = MemoryNotificationCenter::new();
        let windows = MemoryWindowRegistry::new();
        let route = click(&center, &windows, r#"{"data":{"url":"http://[bad"}}"#).await;
        assert_eq!(route, ClickRoute::NoOp);
        assert!(center.is_empty().await);
    }
}
