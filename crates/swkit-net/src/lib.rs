//! # swkit Net
//!
//! HTTP implementation of the agent's [`Network`] capability, backed by
//! reqwest.
//!
//! Responses are classified relative to the agent's origin: same-origin
//! responses are `Basic`, cross-origin responses carrying
//! `Access-Control-Allow-Origin` are `Cors`, and everything else is `Opaque`
//! with its headers and body withheld.

use std::time::Duration;

use async_trait::async_trait;
use http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use http::HeaderMap;
use reqwest::Client;
use swkit_agent::{Body, CredentialsMode, Network, Request, Response, ResponseType};
use swkit_common::{AgentConfig, Result, SwKitError};
use tracing::{debug, info, trace};
use url::{Origin, Url};

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// User agent string.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
    /// Origin the agent runs on.
    pub origin: Url,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: "swkit/0.1".to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            origin: AgentConfig::default().root_url(),
        }
    }
}

impl NetConfig {
    /// Configuration for the origin of an agent's scope.
    pub fn for_agent(config: &AgentConfig) -> Self {
        Self {
            origin: config.root_url(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
///
/// Two clients are kept: one with a cookie store for credentialed requests
/// and one without for `CredentialsMode::Omit`.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    credentialed: Client,
    anonymous: Client,
    origin: Origin,
}

impl HttpNetwork {
    /// Build the network clients.
    pub fn new(config: NetConfig) -> Result<Self> {
        let credentialed = build_client(&config, true)?;
        let anonymous = build_client(&config, false)?;

        info!(origin = %config.origin, "HttpNetwork initialized");

        Ok(Self {
            credentialed,
            anonymous,
            origin: config.origin.origin(),
        })
    }

    fn client_for(&self, request: &Request) -> &Client {
        let same_origin = request.url.origin() == self.origin;
        match request.credentials {
            CredentialsMode::Include => &self.credentialed,
            CredentialsMode::SameOrigin if same_origin => &self.credentialed,
            _ => &self.anonymous,
        }
    }

    /// Classify a response received for `url`.
    pub fn classify(&self, url: &Url, headers: &HeaderMap) -> ResponseType {
        if url.origin() == self.origin {
            ResponseType::Basic
        } else if headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
            ResponseType::Cors
        } else {
            ResponseType::Opaque
        }
    }
}

fn build_client(config: &NetConfig, cookies: bool) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .cookie_store(cookies)
        .build()
        .map_err(|e| SwKitError::network_with_source("failed to build HTTP client", e))
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, mut request: Request) -> Result<Response> {
        debug!(url = %request.url, method = %request.method, "Fetching resource");

        let body = request.take_body()?;
        let mut builder = self
            .client_for(&request)
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            SwKitError::network_with_source(format!("request to {} failed", request.url), e)
        })?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let response_type = self.classify(&url, &headers);

        let bytes = response.bytes().await.map_err(|e| {
            SwKitError::network_with_source(format!("reading body of {} failed", url), e)
        })?;

        trace!(
            url = %url,
            status = %status,
            response_type = ?response_type,
            body_len = bytes.len(),
            "Response received"
        );

        if response_type == ResponseType::Opaque {
            return Ok(Response::new(url, status, response_type, Body::empty()));
        }
        Ok(Response::new(url, status, response_type, Body::new(bytes)).with_headers(headers))
    }
}
