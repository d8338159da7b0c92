//! In-memory cache storage.
//!
//! ```text
//! MemoryCacheStore (caches)
//!     └── MemoryBucket ("pwa-cache-v1")
//!             └── RequestKey → CacheEntry
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderMap, Method, StatusCode};
use swkit_common::{Result, SwKitError};
use tokio::sync::RwLock;
use tracing::trace;
use url::Url;

use crate::capabilities::{CacheBucket, CacheStore};
use crate::fetch::{Body, Request, RequestKey, Response, ResponseType};

/// An immutable captured response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub response_type: ResponseType,
    pub body: Bytes,
}

impl CacheEntry {
    /// Rebuild a fresh response from this entry.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(
            self.url.clone(),
            self.status,
            self.response_type,
            Body::new(self.body.clone()),
        )
        .with_headers(self.headers.clone());
        response.from_cache = true;
        response
    }
}

/// A cache bucket held in memory.
#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    entries: RwLock<HashMap<RequestKey, CacheEntry>>,
}

impl MemoryBucket {
    /// Create an empty bucket.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get all keys.
    pub async fn keys(&self) -> Vec<RequestKey> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Get a stored entry.
    pub async fn entry(&self, key: &RequestKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl CacheBucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&request.key()).map(CacheEntry::to_response))
    }

    async fn put(&self, request: &Request, mut response: Response) -> Result<()> {
        if request.method != Method::GET {
            return Err(SwKitError::cache(format!(
                "cannot cache {} request {}",
                request.method, request.url
            )));
        }

        let key = request.key();
        let entry = CacheEntry {
            key: key.clone(),
            url: response.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            response_type: response.response_type,
            body: response.take_body()?,
        };

        trace!(cache = %self.name, key = %key, bytes = entry.body.len(), "Cache put");
        self.entries.write().await.insert(key, entry);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        Ok(self.entries.write().await.remove(&request.key()).is_some())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Cache storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    buckets: RwLock<HashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryCacheStore {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a bucket with its concrete type, without creating it.
    pub async fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
        self.buckets.read().await.get(name).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        let mut buckets = self.buckets.write().await;
        let bucket: Arc<dyn CacheBucket> = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone();
        Ok(bucket)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.buckets.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.buckets.write().await.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.buckets.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
