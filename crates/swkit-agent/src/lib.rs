//! # swkit Agent
//!
//! A background agent for an installable web application, detached from any
//! single page and driven only by platform events.
//!
//! ## Features
//!
//! - **Cache interceptor**: versioned precache on install, stale bucket
//!   pruning on activate, cache-first fetch interception with background
//!   write-back
//! - **Push dispatcher**: push payloads to notifications (JSON envelope with
//!   plaintext fallback), notification clicks to window routing
//! - **Lifecycle**: `Parsed → Installing → Installed → Activating → Activated`
//! - **Capabilities**: cache storage, network, notifications and windows are
//!   injected, with in-memory implementations included
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerAgent
//!     ├── Registration (installing / waiting / active)
//!     ├── HandlerTable
//!     │       ├── install / activate / fetch ──→ CacheInterceptor
//!     │       └── push / notificationclick ────→ PushDispatcher
//!     └── Capabilities
//!             ├── CacheStore ──→ CacheBucket (Request → Response)
//!             ├── Network
//!             ├── NotificationSink
//!             └── WindowRegistry
//! ```

pub mod agent;
pub mod cache;
pub mod capabilities;
pub mod clients;
pub mod dispatch;
pub mod fetch;
pub mod interceptor;
pub mod notification;
pub mod push;
pub mod registration;

pub use agent::{LifecycleEvent, ServiceWorkerAgent};
pub use cache::{CacheEntry, MemoryBucket, MemoryCacheStore};
pub use capabilities::{
    CacheBucket, CacheStore, Capabilities, Network, NotificationSink, WindowRegistry,
};
pub use clients::{Client, ClientMatchOptions, ClientType, MemoryWindowRegistry};
pub use dispatch::{AgentEvent, EventKind, EventOutcome, HandlerTable};
pub use fetch::{Body, CredentialsMode, Request, RequestKey, Response, ResponseType};
pub use interceptor::{is_cacheable, CacheInterceptor, FetchOutcome, FetchSource};
pub use notification::{
    DisplayedNotification, MemoryNotificationCenter, Notification, NotificationAction,
    NotificationOptions,
};
pub use push::{
    ClickRoute, NotificationClickEvent, PushDispatcher, PushEnvelope, PushEvent, PushMessageData,
};
pub use registration::{Registration, WorkerId, WorkerRecord, WorkerState};
pub use swkit_common::{AgentConfig, Result, SwKitError};
