//! Host capabilities injected into the agent.
//!
//! The agent never reaches for ambient platform state. Cache storage, the
//! network, notification display and the window list are all handed in as
//! trait objects so hosts (and tests) can substitute their own.

use std::sync::Arc;

use async_trait::async_trait;
use swkit_common::Result;
use url::Url;

use crate::clients::{Client, ClientMatchOptions};
use crate::fetch::{Request, Response};
use crate::notification::{Notification, NotificationOptions};

/// Named cache buckets (`caches`).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a bucket, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>>;

    /// Check whether a bucket exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Delete a bucket. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Names of all buckets.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// A single bucket of captured request/response pairs.
#[async_trait]
pub trait CacheBucket: Send + Sync {
    /// Bucket name.
    fn name(&self) -> &str;

    /// Look up a request by exact identity. The returned response has a fresh body.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>>;

    /// Store a response, consuming its body. Overwrites any existing entry.
    async fn put(&self, request: &Request, response: Response) -> Result<()>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, request: &Request) -> Result<bool>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;
}

/// The pass-through network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the real fetch. Transport failures are errors; HTTP error
    /// statuses are ordinary responses.
    async fn fetch(&self, request: Request) -> Result<Response>;
}

/// OS-level notification display.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Show a notification. Completes once the notification is displayed.
    async fn show(&self, title: &str, options: NotificationOptions) -> Result<Notification>;

    /// Close the notification with this tag, if displayed.
    async fn close(&self, tag: &str) -> Result<()>;
}

/// Open browsing contexts of the agent's origin (`clients`).
#[async_trait]
pub trait WindowRegistry: Send + Sync {
    /// Snapshot of matching clients, in platform enumeration order.
    async fn match_all(&self, options: ClientMatchOptions) -> Result<Vec<Client>>;

    /// Focus a window client.
    async fn focus(&self, id: &str) -> Result<Client>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &Url) -> Result<Client>;
}

/// Bundle of every capability the agent may use.
#[derive(Clone)]
pub struct Capabilities {
    pub caches: Arc<dyn CacheStore>,
    pub network: Arc<dyn Network>,
    pub notifications: Arc<dyn NotificationSink>,
    pub windows: Arc<dyn WindowRegistry>,
}

impl Capabilities {
    /// Bundle capabilities.
    pub fn new(
        caches: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        notifications: Arc<dyn NotificationSink>,
        windows: Arc<dyn WindowRegistry>,
    ) -> Self {
        Self {
            caches,
            network,
            notifications,
            windows,
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
