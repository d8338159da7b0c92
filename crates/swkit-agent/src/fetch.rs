//! Single-use request and response values.
//!
//! Bodies are streams on the host platform, so both [`Request`] and
//! [`Response`] carry a consume-once [`Body`]. Reading a body twice fails
//! with [`SwKitError::BodyUsed`]; duplicating a value is an explicit
//! `try_clone` that fails once the body has been read.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use swkit_common::{Result, SwKitError};
use url::Url;

/// A consume-once body handle.
#[derive(Debug, Default)]
pub struct Body {
    bytes: Option<Bytes>,
}

impl Body {
    /// Create a body from bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// An empty, unread body.
    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Whether the body has been consumed.
    pub fn is_used(&self) -> bool {
        self.bytes.is_none()
    }

    /// Consume the body.
    pub fn take(&mut self) -> Result<Bytes> {
        self.bytes.take().ok_or(SwKitError::BodyUsed)
    }

    /// Duplicate an unread body.
    pub fn try_clone(&self) -> Result<Self> {
        match self.bytes {
            Some(ref bytes) => Ok(Self::new(bytes.clone())),
            None => Err(SwKitError::BodyUsed),
        }
    }
}

/// Credentials mode of a request. Ignored for cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Canonical request identity used as the cache key: method and URL
/// without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    /// Build the key for a method and URL.
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.clone(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An outgoing page request.
#[derive(Debug)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub credentials: CredentialsMode,
    body: Body,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, Body::empty())
    }

    /// Create a request with an explicit method and body.
    pub fn new(method: Method, url: Url, body: Body) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            credentials: CredentialsMode::default(),
            body,
        }
    }

    /// Set credentials mode.
    pub fn credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Whether the body has been consumed.
    pub fn body_used(&self) -> bool {
        self.body.is_used()
    }

    /// Consume the body.
    pub fn take_body(&mut self) -> Result<Bytes> {
        self.body.take()
    }

    /// Duplicate the request. Fails if its body was already read.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            credentials: self.credentials,
            body: self.body.try_clone()?,
        })
    }
}

/// Response type, relative to the agent's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin no-cors response; contents are uninspectable.
    Opaque,
    /// Network error response.
    Error,
}

/// A response returned to the page.
#[derive(Debug)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub response_type: ResponseType,
    /// Whether this response was served from the cache.
    pub from_cache: bool,
    body: Body,
}

impl Response {
    /// Create a response.
    pub fn new(url: Url, status: StatusCode, response_type: ResponseType, body: Body) -> Self {
        Self {
            url,
            status,
            headers: HeaderMap::new(),
            response_type,
            from_cache: false,
            body,
        }
    }

    /// Create a same-origin 200 response.
    pub fn basic(url: Url, body: impl Into<Bytes>) -> Self {
        Self::new(url, StatusCode::OK, ResponseType::Basic, Body::new(body))
    }

    /// Set headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Check if status is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the body has been consumed.
    pub fn body_used(&self) -> bool {
        self.body.is_used()
    }

    /// Consume the body.
    pub fn take_body(&mut self) -> Result<Bytes> {
        self.body.take()
    }

    /// Consume the body as UTF-8 text.
    pub fn text(&mut self) -> Result<String> {
        let bytes = self.take_body()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SwKitError::InvalidArgument(format!("response body is not UTF-8: {}", e)))
    }

    /// Duplicate the response. Fails if its body was already read.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            response_type: self.response_type,
            from_cache: self.from_cache,
            body: self.body.try_clone()?,
        })
    }
}
