//! Event handler table.
//!
//! Each platform event kind maps to a function from `(event, capabilities)`
//! to a boxed future of its outcome.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use hashbrown::HashMap;
use swkit_common::{Result, SwKitError};

use crate::capabilities::Capabilities;
use crate::fetch::Request;
use crate::interceptor::{CacheInterceptor, FetchOutcome};
use crate::notification::Notification;
use crate::push::{ClickRoute, NotificationClickEvent, PushDispatcher, PushEvent};

/// Kinds of platform event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
}

impl EventKind {
    /// Platform event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
        }
    }
}

/// A platform event with its payload.
#[derive(Debug)]
pub enum AgentEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(PushEvent),
    NotificationClick(NotificationClickEvent),
}

impl AgentEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            AgentEvent::Install => EventKind::Install,
            AgentEvent::Activate => EventKind::Activate,
            AgentEvent::Fetch(_) => EventKind::Fetch,
            AgentEvent::Push(_) => EventKind::Push,
            AgentEvent::NotificationClick(_) => EventKind::NotificationClick,
        }
    }
}

/// Effect produced by a handler.
#[derive(Debug)]
pub enum EventOutcome {
    Installed,
    /// Names of deleted stale buckets.
    Activated(Vec<String>),
    Fetched(FetchOutcome),
    Shown(Notification),
    Routed(ClickRoute),
}

/// A registered handler.
pub type Handler =
    Arc<dyn Fn(AgentEvent, Capabilities) -> BoxFuture<'static, Result<EventOutcome>> + Send + Sync>;

/// Handlers keyed by event kind.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<EventKind, Handler>,
}

impl HandlerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard table wiring the cache interceptor and the push dispatcher.
    pub fn standard(interceptor: CacheInterceptor, dispatcher: PushDispatcher) -> Self {
        let interceptor = Arc::new(interceptor);
        let dispatcher = Arc::new(dispatcher);
        let mut table = Self::new();

        let i = interceptor.clone();
        table.on(EventKind::Install, move |_, caps| {
            let i = i.clone();
            async move {
                i.install(caps.caches.as_ref(), caps.network.as_ref()).await?;
                Ok::<_, SwKitError>(EventOutcome::Installed)
            }
        });

        let i = interceptor.clone();
        table.on(EventKind::Activate, move |_, caps| {
            let i = i.clone();
            async move {
                let deleted = i.activate(caps.caches.as_ref()).await?;
                Ok::<_, SwKitError>(EventOutcome::Activated(deleted))
            }
        });

        let i = interceptor;
        table.on(EventKind::Fetch, move |event, caps| {
            let i = i.clone();
            async move {
                let AgentEvent::Fetch(request) = event else {
                    return Err(mismatched(EventKind::Fetch));
                };
                let outcome = i
                    .handle_fetch(caps.caches.as_ref(), caps.network.as_ref(), request)
                    .await?;
                Ok(EventOutcome::Fetched(outcome))
            }
        });

        let d = dispatcher.clone();
        table.on(EventKind::Push, move |event, caps| {
            let d = d.clone();
            async move {
                let AgentEvent::Push(push) = event else {
                    return Err(mismatched(EventKind::Push));
                };
                let shown = d.handle_push(caps.notifications.as_ref(), push).await?;
                Ok(EventOutcome::Shown(shown))
            }
        });

        let d = dispatcher;
        table.on(EventKind::NotificationClick, move |event, caps| {
            let d = d.clone();
            async move {
                let AgentEvent::NotificationClick(click) = event else {
                    return Err(mismatched(EventKind::NotificationClick));
                };
                let route = d
                    .handle_click(caps.notifications.as_ref(), caps.windows.as_ref(), click)
                    .await;
                Ok(EventOutcome::Routed(route))
            }
        });

        table
    }

    /// Register (or replace) the handler for an event kind.
    pub fn on<F, Fut>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(AgentEvent, Capabilities) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<EventOutcome>> + Send + 'static,
    {
        self.handlers
            .insert(kind, Arc::new(move |event, caps| handler(event, caps).boxed()));
    }

    /// Whether a handler is registered for `kind`.
    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run the handler for an event.
    pub async fn dispatch(&self, event: AgentEvent, caps: Capabilities) -> Result<EventOutcome> {
        let kind = event.kind();
        let handler = self
            .handlers
            .get(&kind)
            .cloned()
            .ok_or_else(|| SwKitError::NotFound(format!("{} handler", kind.as_str())))?;
        handler(event, caps).await
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn mismatched(kind: EventKind) -> SwKitError {
    SwKitError::InvalidArgument(format!("{} handler received another event", kind.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::capabilities::Network;
    use crate::clients::MemoryWindowRegistry;
    use crate::fetch::Response;
    use crate::notification::MemoryNotificationCenter;
    use async_trait::async_trait;
    use swkit_common::AgentConfig;
    use url::Url;

    struct Offline;

    #[async_trait]
    impl Network for Offline {
        async fn fetch(&self, request: Request) -> Result<Response> {
            Err(SwKitError::network(format!("offline: {}", request.url)))
        }
    }

    fn caps() -> Capabilities {
        Capabilities::new(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(Offline),
            Arc::new(MemoryNotificationCenter::new()),
            Arc::new(MemoryWindowRegistry::new()),
        )
    }

    fn standard() -> HandlerTable {
        let config = AgentConfig::default();
        HandlerTable::standard(
            CacheInterceptor::new(&config).unwrap(),
            PushDispatcher::new(&config),
        )
    }

    #[test]
    fn test_standard_table_covers_every_kind() {
        let table = standard();
        for kind in [
            EventKind::Install,
            EventKind::Activate,
            EventKind::Fetch,
            EventKind::Push,
            EventKind::NotificationClick,
        ] {
            assert!(table.contains(kind), "missing {}", kind.as_str());
        }
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let err = HandlerTable::new()
            .dispatch(AgentEvent::Install, caps())
            .await
            .unwrap_err();
        assert!(matches!(err, SwKitError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_custom_handler_replaces_standard() {
        let mut table = standard();
        table.on(EventKind::Install, |_, _| async {
            Ok::<_, SwKitError>(EventOutcome::Installed)
        });

        let outcome = table.dispatch(AgentEvent::Install, caps()).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Installed));
    }

    #[tokio::test]
    async fn test_push_dispatch_shows_notification() {
        let outcome = standard()
            .dispatch(AgentEvent::Push(PushEvent::with_payload("ping")), caps())
            .await
            .unwrap();
        match outcome {
            EventOutcome::Shown(n) => assert_eq!(n.options.body, "ping"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_dispatch_propagates_network_error() {
        let request = Request::get(Url::parse("http://localhost:3000/x").unwrap());
        let err = standard()
            .dispatch(AgentEvent::Fetch(request), caps())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "network");
    }
}
