//! Cache interceptor: versioned precache on install, stale bucket pruning on
//! activate, cache-first request interception.

use std::sync::Arc;

use futures::future::try_join_all;
use http::StatusCode;
use swkit_common::{AgentConfig, Result, SwKitError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::capabilities::{CacheBucket, CacheStore, Network};
use crate::fetch::{Request, Response, ResponseType};

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// Result of intercepting one request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: FetchSource,
    /// Detached cache write, if the response is being cached. Dropping the
    /// handle leaves the write running.
    pub write_back: Option<JoinHandle<()>>,
}

/// Cache-first interceptor owning one versioned bucket.
#[derive(Debug, Clone)]
pub struct CacheInterceptor {
    cache_name: String,
    precache: Vec<Url>,
}

impl CacheInterceptor {
    /// Create an interceptor from the agent configuration. Fails if a
    /// manifest path cannot be resolved against the scope.
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let precache = config
            .precache
            .iter()
            .map(|path| config.resolve(path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            cache_name: config.cache_name(),
            precache,
        })
    }

    /// Name of the current bucket.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Resolved precache manifest.
    pub fn precache(&self) -> &[Url] {
        &self.precache
    }

    /// Install: open the current bucket and store every manifest resource.
    ///
    /// All resources are fetched and checked before anything is written, so a
    /// single failure leaves the bucket untouched.
    pub async fn install(&self, caches: &dyn CacheStore, network: &dyn Network) -> Result<()> {
        let bucket = caches.open(&self.cache_name).await?;

        let fetched = try_join_all(self.precache.iter().map(|url| async move {
            let request = Request::get(url.clone());
            let response = network.fetch(request.try_clone()?).await?;
            if !response.ok() {
                return Err(SwKitError::network(format!(
                    "precache of {} failed with status {}",
                    url, response.status
                )));
            }
            Ok::<_, SwKitError>((request, response))
        }))
        .await?;

        for (request, response) in fetched {
            bucket.put(&request, response).await?;
        }

        info!(cache = %self.cache_name, entries = self.precache.len(), "Precache complete");
        Ok(())
    }

    /// Activate: delete every bucket other than the current one. Returns the
    /// deleted names.
    pub async fn activate(&self, caches: &dyn CacheStore) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in caches.keys().await? {
            if name != self.cache_name && caches.delete(&name).await? {
                info!(cache = %name, "Deleted stale cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Intercept a request: serve from cache, else fetch from the network and
    /// cache successful same-origin responses in the background.
    ///
    /// Network failures propagate unchanged.
    pub async fn handle_fetch(
        &self,
        caches: &dyn CacheStore,
        network: &dyn Network,
        request: Request,
    ) -> Result<FetchOutcome> {
        let bucket = match caches.open(&self.cache_name).await {
            Ok(bucket) => Some(bucket),
            Err(e) => {
                warn!(cache = %self.cache_name, error = %e, "Cache unavailable, using network");
                None
            }
        };

        if let Some(ref bucket) = bucket {
            match bucket.match_request(&request).await {
                Ok(Some(response)) => {
                    debug!(key = %request.key(), "Cache hit");
                    return Ok(FetchOutcome {
                        response,
                        source: FetchSource::Cache,
                        write_back: None,
                    });
                }
                Ok(None) => debug!(key = %request.key(), "Cache miss"),
                Err(e) => warn!(key = %request.key(), error = %e, "Cache lookup failed"),
            }
        }

        let response = network.fetch(request.try_clone()?).await?;

        let write_back = match bucket {
            Some(bucket) if is_cacheable(&response) => match response.try_clone() {
                Ok(copy) => Some(spawn_cache_write(bucket, request, copy)),
                Err(e) => {
                    warn!(
                        key = %request.key(),
                        error = %e,
                        "Response body already read, not caching"
                    );
                    None
                }
            },
            _ => None,
        };

        Ok(FetchOutcome {
            response,
            source: FetchSource::Network,
            write_back,
        })
    }
}

/// Only complete same-origin responses are cached; cross-origin (CORS or
/// opaque) responses never are.
pub fn is_cacheable(response: &Response) -> bool {
    response.status == StatusCode::OK && response.response_type == ResponseType::Basic
}

fn spawn_cache_write(
    bucket: Arc<dyn CacheBucket>,
    request: Request,
    response: Response,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let key = request.key();
        match bucket.put(&request, response).await {
            Ok(()) => debug!(cache = %bucket.name(), key = %key, "Cached network response"),
            Err(e) => warn!(
                cache = %bucket.name(),
                key = %key,
                error = %e,
                category = e.category(),
                "Cache write failed"
            ),
        }
    })
}
