//! The background agent: lifecycle bookkeeping around the handler table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use swkit_common::{AgentConfig, Result, SwKitError};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::capabilities::Capabilities;
use crate::dispatch::{AgentEvent, EventOutcome, HandlerTable};
use crate::fetch::Request;
use crate::interceptor::{CacheInterceptor, FetchOutcome, FetchSource};
use crate::notification::Notification;
use crate::push::{ClickRoute, NotificationClickEvent, PushDispatcher, PushEvent};
use crate::registration::{Registration, WorkerId, WorkerState};

/// Lifecycle notifications emitted by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A worker changed state.
    StateChange {
        worker_id: WorkerId,
        cache_version: u32,
        new_state: WorkerState,
    },
    /// Activation deleted stale buckets.
    CachesPruned { deleted: Vec<String> },
}

/// Counts an event whose handler is still running.
struct ExtendGuard(Arc<AtomicUsize>);

impl ExtendGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ExtendGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A cache interceptor and push dispatcher driven by platform events.
///
/// The agent keeps no durable state of its own: everything that must survive
/// termination lives in the cache store.
pub struct ServiceWorkerAgent {
    cache_version: u32,
    capabilities: Capabilities,
    handlers: HandlerTable,
    registration: RwLock<Registration>,
    event_tx: mpsc::UnboundedSender<LifecycleEvent>,
    in_flight: Arc<AtomicUsize>,
}

impl ServiceWorkerAgent {
    /// Create an agent with the standard handler table.
    pub fn new(
        config: AgentConfig,
        capabilities: Capabilities,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LifecycleEvent>)> {
        let handlers = HandlerTable::standard(
            CacheInterceptor::new(&config)?,
            PushDispatcher::new(&config),
        );
        Ok(Self::with_handlers(config, capabilities, handlers))
    }

    /// Create an agent with a custom handler table.
    pub fn with_handlers(
        config: AgentConfig,
        capabilities: Capabilities,
        handlers: HandlerTable,
    ) -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let agent = Self {
            cache_version: config.cache_version,
            capabilities,
            handlers,
            registration: RwLock::new(Registration::new()),
            event_tx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        };
        (agent, event_rx)
    }

    /// State of the newest worker version.
    pub async fn state(&self) -> WorkerState {
        self.registration.read().await.current_state()
    }

    /// Number of events whose handlers are still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether the host may terminate this instance.
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Run the install event. On failure the new worker becomes redundant and
    /// any previously active worker stays in control.
    pub async fn install(&self) -> Result<()> {
        {
            let mut registration = self.registration.write().await;
            let worker = registration.begin_install(self.cache_version);
            self.emit_state(worker.id, worker.cache_version, worker.state);
        }

        let result = self.dispatch(AgentEvent::Install).await;

        let mut registration = self.registration.write().await;
        match result {
            Ok(_) => {
                if let Some(worker) = registration.install_complete() {
                    info!(version = worker.cache_version, "Worker installed");
                    self.emit_state(worker.id, worker.cache_version, worker.state);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(worker) = registration.install_failed() {
                    warn!(version = worker.cache_version, error = %e, "Install failed");
                    self.emit_state(worker.id, worker.cache_version, worker.state);
                }
                Err(e)
            }
        }
    }

    /// Run the activate event for the waiting worker. Returns the deleted
    /// bucket names.
    ///
    /// A failing handler is logged and the worker is activated regardless.
    pub async fn activate(&self) -> Result<Vec<String>> {
        {
            let mut registration = self.registration.write().await;
            let worker = registration
                .begin_activate()
                .ok_or_else(|| SwKitError::InvalidState("no installed worker waiting".into()))?;
            self.emit_state(worker.id, worker.cache_version, worker.state);
        }

        let deleted = match self.dispatch(AgentEvent::Activate).await {
            Ok(EventOutcome::Activated(deleted)) => deleted,
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, category = e.category(), "Activate handler failed");
                Vec::new()
            }
        };

        let mut registration = self.registration.write().await;
        if let Some(worker) = registration.activate_complete() {
            info!(version = worker.cache_version, "Worker activated");
            self.emit_state(worker.id, worker.cache_version, worker.state);
        }
        if !deleted.is_empty() {
            let _ = self.event_tx.send(LifecycleEvent::CachesPruned {
                deleted: deleted.clone(),
            });
        }
        Ok(deleted)
    }

    /// Intercept a page request.
    ///
    /// Until a worker is activating or active the page is uncontrolled and
    /// the request goes straight to the network, bypassing the cache.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome> {
        if !self.registration.read().await.is_serving() {
            let _guard = ExtendGuard::new(&self.in_flight);
            debug!(key = %request.key(), "Uncontrolled fetch, using network");
            let response = self.capabilities.network.fetch(request).await?;
            return Ok(FetchOutcome {
                response,
                source: FetchSource::Network,
                write_back: None,
            });
        }
        match self.dispatch(AgentEvent::Fetch(request)).await? {
            EventOutcome::Fetched(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    /// Show the notification for a push event.
    pub async fn handle_push(&self, event: PushEvent) -> Result<Notification> {
        match self.dispatch(AgentEvent::Push(event)).await? {
            EventOutcome::Shown(notification) => Ok(notification),
            other => Err(unexpected(other)),
        }
    }

    /// Route a notification click.
    pub async fn handle_notification_click(
        &self,
        event: NotificationClickEvent,
    ) -> Result<ClickRoute> {
        match self.dispatch(AgentEvent::NotificationClick(event)).await? {
            EventOutcome::Routed(route) => Ok(route),
            other => Err(unexpected(other)),
        }
    }

    /// Dispatch a raw event through the handler table, keeping the agent
    /// alive until the handler completes.
    pub async fn dispatch(&self, event: AgentEvent) -> Result<EventOutcome> {
        let _guard = ExtendGuard::new(&self.in_flight);
        let span = info_span!("event", kind = event.kind().as_str());
        self.handlers
            .dispatch(event, self.capabilities.clone())
            .instrument(span)
            .await
    }

    fn emit_state(&self, worker_id: WorkerId, cache_version: u32, new_state: WorkerState) {
        let _ = self.event_tx.send(LifecycleEvent::StateChange {
            worker_id,
            cache_version,
            new_state,
        });
    }
}

impl std::fmt::Debug for ServiceWorkerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorkerAgent")
            .field("cache_version", &self.cache_version)
            .field("handlers", &self.handlers)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

fn unexpected(outcome: EventOutcome) -> SwKitError {
    SwKitError::internal(format!("handler produced unexpected outcome: {:?}", outcome))
}
